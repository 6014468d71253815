//! Page fetching with request coalescing.
//!
//! At most one request per `(page, page_size)` key is in flight per
//! generation.  Each request is a [`Shared`] future: every caller interested
//! in the page awaits a clone of the same handle, and a spawned watcher posts
//! the settled result to the host loop as a [`FetchCompletion`].  The host
//! applies completions in the order they arrive.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::mpsc;

use super::source::PageSource;
use crate::core::cache::{empty_items, padded_items, PageCache, PageItems, PageStatus};
use crate::core::error::FetchError;
use crate::core::position::Page;

pub type FetchResult<T> = Result<Arc<Vec<T>>, FetchError>;

type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page: Page,
    pub page_size: usize,
}

/// Settled request, tagged with the generation that issued it.
#[derive(Debug)]
pub struct FetchCompletion<T> {
    pub generation: u64,
    pub page: Page,
    pub result: FetchResult<T>,
}

/// A clonable handle on one in-flight request.
#[derive(Clone)]
pub struct PageHandle<T> {
    page: Page,
    page_size: usize,
    shared: SharedFetch<T>,
}

impl<T: Clone + Send + Sync + 'static> PageHandle<T> {
    pub fn page(&self) -> Page {
        self.page
    }

    /// The raw outcome, failure included.
    pub async fn result(self) -> FetchResult<T> {
        self.shared.await
    }

    /// Rows padded to the page size.  A failed fetch yields a blank page.
    pub async fn rows(self) -> PageItems<T> {
        let page_size = self.page_size;
        match self.shared.await {
            Ok(rows) => padded_items(rows.iter().cloned(), page_size),
            Err(_) => empty_items(page_size),
        }
    }
}

/// What [`PageFetcher::fetch_page`] did.
pub enum PageFetch<T> {
    /// Served from cache, no network call.
    Ready(PageItems<T>),
    /// Attached to the request already in flight for this key.
    Joined(PageHandle<T>),
    /// Started a new request.
    Issued(PageHandle<T>),
}

impl<T> PageFetch<T> {
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued(_))
    }
}

/// How eager a fetch should be about settled pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Cached pages, including Failed ones, are final.
    Normal,
    /// Failed pages are requested again.
    RetryFailed,
    /// Request again even when Loaded.  Still joins an in-flight request.
    Force,
}

pub struct PageFetcher<T> {
    source: Arc<dyn PageSource<Item = T>>,
    page_size: usize,
    generation: u64,
    in_flight: HashMap<PageKey, SharedFetch<T>>,
    completions: mpsc::UnboundedSender<FetchCompletion<T>>,
    issued: u64,
}

impl<T: Clone + Send + Sync + 'static> PageFetcher<T> {
    pub fn new(
        source: Arc<dyn PageSource<Item = T>>,
        page_size: usize,
        completions: mpsc::UnboundedSender<FetchCompletion<T>>,
    ) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            generation: 0,
            in_flight: HashMap::new(),
            completions,
            issued: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Network calls issued over the fetcher's lifetime.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn is_in_flight(&self, page: Page) -> bool {
        self.in_flight.contains_key(&self.key(page))
    }

    pub fn in_flight_pages(&self) -> Vec<Page> {
        let mut pages: Vec<Page> = self.in_flight.keys().map(|k| k.page).collect();
        pages.sort_unstable();
        pages
    }

    fn key(&self, page: Page) -> PageKey {
        PageKey {
            page,
            page_size: self.page_size,
        }
    }

    /// Get `page` from cache, join its in-flight request, or start one.
    ///
    /// `expected` is the number of real rows the page should hold (short for
    /// the trailing page).  Must run inside a tokio runtime.
    pub fn fetch_page(
        &mut self,
        cache: &mut PageCache<T>,
        page: Page,
        expected: usize,
        mode: FetchMode,
    ) -> PageFetch<T> {
        let key = self.key(page);

        if mode != FetchMode::Force && cache.status(page) == PageStatus::Loaded {
            // Short pages are final too.
            if !cache.covers(page, expected) {
                tracing::debug!(page, expected, "serving short page from cache");
            }
            if let Some(items) = cache.settled_items(page) {
                return PageFetch::Ready(items);
            }
        }
        if let Some(shared) = self.in_flight.get(&key) {
            tracing::debug!(page, "joined in-flight page request");
            return PageFetch::Joined(self.handle(page, shared.clone()));
        }
        if mode == FetchMode::Normal && cache.status(page) == PageStatus::Failed {
            if let Some(items) = cache.settled_items(page) {
                return PageFetch::Ready(items);
            }
        }

        PageFetch::Issued(self.issue(cache, key))
    }

    fn issue(&mut self, cache: &mut PageCache<T>, key: PageKey) -> PageHandle<T> {
        let PageKey { page, page_size } = key;
        cache.mark_pending(page);
        self.issued += 1;
        tracing::debug!(page, page_size, generation = self.generation, "requesting page");

        let shared = self
            .source
            .request_page(page, page_size)
            .map(move |result| {
                result
                    .map(Arc::new)
                    .map_err(|err| FetchError::from_source(page, &err))
            })
            .boxed()
            .shared();
        self.in_flight.insert(key, shared.clone());

        let generation = self.generation;
        let completions = self.completions.clone();
        let settled = shared.clone();
        tokio::spawn(async move {
            let result = settled.await;
            // The host loop may already be gone.
            let _ = completions.send(FetchCompletion {
                generation,
                page,
                result,
            });
        });

        self.handle(page, shared)
    }

    fn handle(&self, page: Page, shared: SharedFetch<T>) -> PageHandle<T> {
        PageHandle {
            page,
            page_size: self.page_size,
            shared,
        }
    }

    /// Fold a settled request into `cache`.  Returns the page's new rows, or
    /// `None` when the completion belongs to an earlier generation.
    pub fn complete(
        &mut self,
        cache: &mut PageCache<T>,
        completion: FetchCompletion<T>,
    ) -> Option<PageItems<T>> {
        let FetchCompletion {
            generation,
            page,
            result,
        } = completion;
        if generation != self.generation {
            tracing::debug!(
                page,
                generation,
                current = self.generation,
                "dropping stale page completion"
            );
            return None;
        }
        self.in_flight.remove(&self.key(page));

        let items = match result {
            Ok(rows) => cache.store_loaded(page, rows.iter().cloned()),
            Err(err) => {
                tracing::warn!(page, error = %err, "page fetch failed; showing blank rows");
                cache.store_failed(page)
            }
        };
        Some(items)
    }

    /// Point the fetcher at a different data source.  Callers reset the
    /// generation alongside, since the old source's results no longer apply.
    pub fn set_source(&mut self, source: Arc<dyn PageSource<Item = T>>) {
        self.source = source;
    }

    /// Forget every in-flight request and start a new generation.  Requests
    /// already running still settle, but their completions are dropped.
    pub fn reset(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight.clear();
        self.generation
    }
}
