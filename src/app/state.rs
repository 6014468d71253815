//! Central viewer state.
//!
//! The engine, the scroll position and the viewer's own flags live here so
//! that rendering is a pure function over `&AppState` and input handling a
//! function over `&mut AppState`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::engine::VirtualList;
use super::http_source::HttpSource;
use super::source::{PageSource, SyntheticSource};
use crate::config::ViewerConfig;
use crate::ui::spinner::SpinnerClock;

/// Time per spinner frame.
const SPINNER_PERIOD: Duration = Duration::from_millis(80);

/// Where rows come from.
#[derive(Debug, Clone)]
pub enum SourceKind {
    Synthetic {
        latency: Duration,
        fail_every: Option<u64>,
    },
    Http {
        url: String,
    },
}

/// One entry in the dataset rotation (`n` cycles through them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub name: String,
    pub total_items: usize,
}

impl SourceKind {
    pub fn build(&self, dataset: &DatasetEntry) -> Arc<dyn PageSource<Item = Value>> {
        match self {
            Self::Synthetic { latency, fail_every } => Arc::new(
                SyntheticSource::new(dataset.name.clone(), dataset.total_items, *latency)
                    .fail_every(*fail_every),
            ),
            Self::Http { url } => Arc::new(HttpSource::<Value>::new(url.clone())),
        }
    }
}

pub struct AppState {
    pub list: VirtualList<Value>,
    pub source_kind: SourceKind,
    pub datasets: Vec<DatasetEntry>,
    pub dataset_index: usize,
    /// Persisted viewer settings.
    pub config: ViewerConfig,
    /// Viewport height in rows, as last laid out.
    pub viewport_rows: u16,
    /// Current spinner frame.
    pub tick: u64,
    spinner: SpinnerClock,
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(
        list: VirtualList<Value>,
        source_kind: SourceKind,
        datasets: Vec<DatasetEntry>,
        config: ViewerConfig,
    ) -> Self {
        Self {
            list,
            source_kind,
            datasets,
            dataset_index: 0,
            config,
            viewport_rows: 0,
            tick: 0,
            spinner: SpinnerClock::new(Instant::now(), SPINNER_PERIOD),
            status_message: None,
            should_quit: false,
        }
    }

    /// Move the spinner on to the frame for `now`.
    pub fn advance_spinner(&mut self, now: Instant) {
        self.tick = self.spinner.tick_at(now);
    }

    /// Largest offset that still fills the viewport.
    pub fn max_offset(&self) -> f64 {
        (self.list.total_height() - f64::from(self.viewport_rows)).max(0.0)
    }

    /// Scroll to `offset` (clamped) and hand the event to the engine.
    pub fn scroll_to(&mut self, offset: f64) {
        let offset = offset.clamp(0.0, self.max_offset());
        self.list.on_scroll(offset, Instant::now());
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.scroll_to(self.list.current_offset() + delta);
    }

    pub fn set_viewport_rows(&mut self, rows: u16) {
        if rows != self.viewport_rows {
            self.viewport_rows = rows;
            self.list.set_viewport_height(f64::from(rows));
        }
    }

    /// Rotate to the next dataset identity.
    pub fn next_dataset(&mut self) {
        if self.datasets.is_empty() {
            return;
        }
        self.dataset_index = (self.dataset_index + 1) % self.datasets.len();
        let entry = self.datasets[self.dataset_index].clone();
        let source = self.source_kind.build(&entry);
        self.list.set_dataset(entry.name.clone(), entry.total_items, source);
        self.status_message =
            Some(format!("switched to {} ({} rows)", entry.name, entry.total_items));
    }

    pub fn toggle_retry_failed(&mut self) {
        self.config.retry_failed = !self.config.retry_failed;
        self.list.set_retry_failed(self.config.retry_failed);
        let verb = if self.config.retry_failed { "retried" } else { "kept blank" };
        self.status_message = Some(match self.config.save() {
            Ok(()) => format!("failed pages are now {verb}"),
            Err(err) => {
                tracing::warn!(error = %err, "could not save viewer config");
                format!("failed pages are now {verb} (not saved: {err})")
            }
        });
    }
}
