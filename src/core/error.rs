//! Error taxonomy for the engine.
//!
//! Only configuration mistakes are hard errors.  Fetch failures are values
//! that get cached and logged; malformed scroll positions are clamped; a
//! duplicate request is coalesced; slot starvation is resolved by eviction.

use thiserror::Error;

use super::position::Page;

/// Rejected engine configuration.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("page size must be at least 1")]
    ZeroPageSize,
    #[error("slot pool needs at least one slot")]
    ZeroSlots,
    #[error("item height must be finite and positive, got {0}")]
    InvalidItemHeight(f64),
    #[error("header offset must be finite, got {0}")]
    InvalidHeaderOffset(f64),
}

/// A page fetch that did not produce items.
///
/// `Clone` because one failure is handed to every caller attached to the
/// coalesced request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("page {page} failed: {message}")]
    Source { page: Page, message: String },
}

impl FetchError {
    pub fn from_source(page: Page, err: &anyhow::Error) -> Self {
        Self::Source {
            page,
            message: format!("{err:#}"),
        }
    }
}
