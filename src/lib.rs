//! Windowed virtual list over a paginated remote dataset.
//!
//! A handful of recycled page slots follow the scroll position; pages are
//! fetched once, coalesced, cached, and attached to slots as they settle in
//! whatever order the source answers.

pub mod app;
pub mod config;
pub mod core;
pub mod ui;

pub use crate::app::engine::{DatasetId, DebugInfo, RowView, VirtualList};
pub use crate::app::fetcher::{FetchCompletion, PageFetcher};
pub use crate::app::source::PageSource;
pub use crate::config::ListConfig;
pub use crate::core::position::{Page, PositionMapper};
