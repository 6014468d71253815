//! Colour palette and text styles used across the UI.

use ratatui::style::{Color, Modifier, Style};

pub struct Theme;

impl Theme {
    // ── rows ───────────────────────────────────────────────────
    pub fn row_number_style() -> Style {
        Style::default().fg(Color::DarkGray)
    }

    pub fn item_style() -> Style {
        Style::default().fg(Color::White)
    }

    pub fn detail_style() -> Style {
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::DIM)
    }

    /// Rows whose page has not arrived or failed.
    pub fn placeholder_style() -> Style {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    }

    pub fn loading_style() -> Style {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    pub fn page_rule_style() -> Style {
        Style::default().fg(Color::Blue)
    }

    // ── chrome ─────────────────────────────────────────────────
    pub fn border_style() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn title_style() -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_style() -> Style {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    }
}
