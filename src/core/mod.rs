//! Core engine pieces – position arithmetic, page cache, slot and indicator
//! pools.
//!
//! Nothing in this module depends on the async runtime or any rendering
//! crate.  The `app` layer wires these together.

pub mod cache;
pub mod error;
pub mod loading;
pub mod position;
pub mod slots;
