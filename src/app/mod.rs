//! Async glue around the core: data sources, the fetcher, scroll sampling,
//! the `VirtualList` engine, and the terminal viewer's event plumbing.

pub mod engine;
pub mod event;
pub mod fetcher;
pub mod handler;
pub mod http_source;
pub mod source;
pub mod state;
pub mod watcher;
