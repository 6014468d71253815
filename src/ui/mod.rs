//! UI / rendering layer: everything that touches Ratatui widgets.
//!
//! Reads the engine through `&VirtualList`; never starts fetches.

pub mod layout;
pub mod list_widget;
pub mod spinner;
pub mod theme;
