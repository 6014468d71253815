//! Input handling: maps key and wheel events to scroll and engine calls.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::event::AppEvent;
use super::state::AppState;

/// Rows moved per mouse-wheel notch.
pub const WHEEL_ROWS: f64 = 3.0;

/// Dispatch one terminal event.
pub fn handle_event(state: &mut AppState, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(state, key),
        AppEvent::Wheel(notches) => state.scroll_by(f64::from(notches) * WHEEL_ROWS),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => state.advance_spinner(Instant::now()),
    }
}

pub fn handle_key(state: &mut AppState, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    // Ctrl+c always quits.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.should_quit = true;
        return;
    }

    let line = state.list.mapper().item_height();
    let page = f64::from(state.viewport_rows.saturating_sub(1).max(1));

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => state.should_quit = true,
        KeyCode::Down | KeyCode::Char('j') => state.scroll_by(line),
        KeyCode::Up | KeyCode::Char('k') => state.scroll_by(-line),
        KeyCode::PageDown | KeyCode::Char(' ') => state.scroll_by(page),
        KeyCode::PageUp => state.scroll_by(-page),
        KeyCode::Home | KeyCode::Char('g') => state.scroll_to(0.0),
        KeyCode::End | KeyCode::Char('G') => state.scroll_to(state.max_offset()),
        KeyCode::Char('n') => state.next_dataset(),
        KeyCode::Char('R') => {
            let issued = state.list.refresh();
            state.status_message = Some(format!("refreshed ({issued} requests)"));
        }
        KeyCode::Char('r') => {
            let page = state.list.current_page();
            state.status_message = Some(if state.list.force_refetch(page) {
                format!("refetching page {page}")
            } else {
                format!("page {page} is already loading")
            });
        }
        KeyCode::Char('f') => state.toggle_retry_failed(),
        _ => {}
    }
}
