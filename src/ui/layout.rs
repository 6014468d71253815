//! Layout helpers: split the terminal into the list viewport and a status bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    /// Bordered list pane.
    pub list_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    pub fn from_area(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // list pane
                Constraint::Length(1), // status bar
            ])
            .split(area);

        Self {
            list_area: chunks[0],
            status_area: chunks[1],
        }
    }

    /// Rows available to list content inside the pane border.
    pub fn viewport_rows(&self) -> u16 {
        self.list_area.height.saturating_sub(2)
    }
}
