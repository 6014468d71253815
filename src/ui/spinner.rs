//! Busy indicator: a braille spinner with a short label, centred on one line.

use std::time::{Duration, Instant};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use super::theme::Theme;

/// Braille-dot spinner frames.  Cycles through these on each tick.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn spinner_frame(tick: u64) -> &'static str {
    SPINNER_FRAMES[(tick % SPINNER_FRAMES.len() as u64) as usize]
}

/// Maps wall-clock time to a spinner tick, so frames advance at a steady
/// rate however often the screen is redrawn.
#[derive(Debug, Clone, Copy)]
pub struct SpinnerClock {
    started: Instant,
    period: Duration,
}

impl SpinnerClock {
    pub fn new(started: Instant, period: Duration) -> Self {
        Self {
            started,
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn tick_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_millis() / self.period.as_millis()) as u64
    }
}

/// "⠋ loading page 4", drawn centred on the first row of its area.
pub struct PageSpinner {
    pub page: usize,
    pub tick: u64,
}

impl Widget for PageSpinner {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width < 4 {
            return;
        }

        let label = format!(" {} loading page {} ", spinner_frame(self.tick), self.page);
        let label_width = (label.chars().count() as u16).min(area.width);
        let x = area.x + (area.width - label_width) / 2;

        let line = Line::from(Span::styled(label, Theme::loading_style()));
        buf.set_line(x, area.y, &line, label_width);
    }
}
