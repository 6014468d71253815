//! Data source contract plus an in-process source for the viewer.
//!
//! The engine never knows the transport: it asks for `(page, page_size)` and
//! awaits rows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};

use crate::core::position::Page;

/// Supplies one page of rows at a time.
///
/// The returned future must own everything it needs; the fetcher may poll
/// it after the caller that started it has moved on.
pub trait PageSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn request_page(
        &self,
        page: Page,
        page_size: usize,
    ) -> BoxFuture<'static, anyhow::Result<Vec<Self::Item>>>;
}

/// Generated rows with simulated latency and optional failures.
///
/// Latency varies per page so completions regularly arrive out of request
/// order.
#[derive(Debug)]
pub struct SyntheticSource {
    dataset: String,
    total_items: usize,
    latency: Duration,
    /// Every n-th call fails.
    fail_every: Option<u64>,
    calls: AtomicU64,
}

impl SyntheticSource {
    pub fn new(dataset: impl Into<String>, total_items: usize, latency: Duration) -> Self {
        Self {
            dataset: dataset.into(),
            total_items,
            latency,
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn fail_every(mut self, n: Option<u64>) -> Self {
        self.fail_every = n.filter(|&n| n > 0);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn delay_for(&self, page: Page) -> Duration {
        let base = self.latency.as_millis() as u64;
        let jitter = (page as u64).wrapping_mul(7919) % (base / 2 + 1);
        Duration::from_millis(base + jitter)
    }
}

/// Stable pseudo-random label bits for a row.
fn hash_label(index: usize) -> usize {
    index.wrapping_mul(2_654_435_761) & 0xff_ffff
}

impl PageSource for SyntheticSource {
    type Item = Value;

    fn request_page(
        &self,
        page: Page,
        page_size: usize,
    ) -> BoxFuture<'static, anyhow::Result<Vec<Value>>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let fails = self.fail_every.is_some_and(|n| call % n == 0);
        let delay = self.delay_for(page);
        let dataset = self.dataset.clone();
        let start = page.saturating_sub(1) * page_size;
        let end = (start + page_size).min(self.total_items);

        async move {
            tokio::time::sleep(delay).await;
            if fails {
                anyhow::bail!("simulated outage on call {call}");
            }
            let rows: Vec<Value> = (start..end)
                .map(|index| {
                    json!({
                        "row": index + 1,
                        "dataset": dataset,
                        "label": format!("item {:06x}", hash_label(index)),
                    })
                })
                .collect();
            Ok(rows)
        }
        .boxed()
    }
}
