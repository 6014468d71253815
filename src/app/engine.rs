//! `VirtualList`: one engine instance per mounted viewport.
//!
//! Owns the position mapper, page cache, fetcher, slot pool, loading
//! indicators and scroll watcher for a single dataset identity.  All methods
//! take `&mut self` and run on the host's event loop; fetch results come back
//! through the completion channel handed to [`VirtualList::new`] and are
//! folded in with [`VirtualList::apply_completion`].
//!
//! Methods that may start a fetch spawn onto the current tokio runtime.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use super::fetcher::{FetchCompletion, FetchMode, PageFetch, PageFetcher};
use super::source::PageSource;
use super::watcher::{target_pages, ScrollWatcher};
use crate::config::ListConfig;
use crate::core::cache::{PageCache, PageStatus};
use crate::core::error::EngineError;
use crate::core::loading::{LoadingIndicator, LoadingIndicatorPool};
use crate::core::position::{Page, PositionMapper};
use crate::core::slots::{Acquired, RenderSlot, SlotPool};

/// Opaque dataset identity.  Changing it invalidates everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DatasetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What the row template gets for one absolute index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowView<'a, T> {
    /// `None` while the page is loading, after a failed fetch, or when no
    /// slot holds the page.
    pub item: Option<&'a T>,
    pub index: usize,
    pub visible: bool,
    pub loading: bool,
}

/// Point-in-time view of the engine's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugInfo {
    pub dataset: String,
    pub generation: u64,
    pub current_page: Page,
    pub max_pages: usize,
    /// Tag of every slot, in slot order.
    pub slot_pages: Vec<Option<Page>>,
    pub loaded_pages: Vec<Page>,
    pub failed_pages: Vec<Page>,
    pub pending_pages: Vec<Page>,
    pub requests_issued: u64,
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<String> = self
            .slot_pages
            .iter()
            .map(|p| p.map_or_else(|| "-".to_string(), |p| p.to_string()))
            .collect();
        write!(
            f,
            "{} · page {}/{} · slots [{}] · pending {:?} · failed {:?} · {} requests",
            self.dataset,
            self.current_page,
            self.max_pages,
            slots.join(" "),
            self.pending_pages,
            self.failed_pages,
            self.requests_issued,
        )
    }
}

pub struct VirtualList<T> {
    config: ListConfig,
    mapper: PositionMapper,
    cache: PageCache<T>,
    fetcher: PageFetcher<T>,
    slots: SlotPool<T>,
    loading: LoadingIndicatorPool,
    watcher: ScrollWatcher,
    dataset: DatasetId,
    viewport_height: f64,
}

impl<T: Clone + Send + Sync + 'static> VirtualList<T> {
    pub fn new(
        config: ListConfig,
        dataset: impl Into<DatasetId>,
        source: Arc<dyn PageSource<Item = T>>,
        completions: mpsc::UnboundedSender<FetchCompletion<T>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            mapper: config.mapper(),
            cache: PageCache::new(config.page_size),
            fetcher: PageFetcher::new(source, config.page_size, completions),
            slots: SlotPool::new(config.slot_count),
            loading: LoadingIndicatorPool::new(config.slot_count),
            watcher: ScrollWatcher::new(config.scroll_throttle, config.scroll_hold),
            dataset: dataset.into(),
            viewport_height: 0.0,
            config,
        })
    }

    // ───────────────────────────────────────── accessors ─────

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn mapper(&self) -> &PositionMapper {
        &self.mapper
    }

    pub fn slots(&self) -> &[RenderSlot<T>] {
        self.slots.slots()
    }

    pub fn indicators(&self) -> impl Iterator<Item = &LoadingIndicator> {
        self.loading.active()
    }

    pub fn dataset(&self) -> &DatasetId {
        &self.dataset
    }

    pub fn generation(&self) -> u64 {
        self.fetcher.generation()
    }

    pub fn requests_issued(&self) -> u64 {
        self.fetcher.issued()
    }

    pub fn current_offset(&self) -> f64 {
        self.watcher.current_offset()
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn current_page(&self) -> Page {
        self.mapper.page_from_offset(self.watcher.current_offset())
    }

    /// Scrollable extent: every row plus the header.
    pub fn total_height(&self) -> f64 {
        self.mapper.total_height()
    }

    /// Height a tagged slot occupies: the renderer's measurement when there
    /// is one, else the page's nominal extent.
    pub fn slot_height(&self, slot: &RenderSlot<T>) -> f64 {
        match (slot.measured_height, slot.tagged_page) {
            (Some(height), _) => height,
            (None, Some(page)) => self.mapper.page_extent(page),
            (None, None) => 0.0,
        }
    }

    // ───────────────────────────────────────── scrolling ─────

    /// Feed a scroll event.  Returns whether it was handled (outside the
    /// throttle window and any hold).
    pub fn on_scroll(&mut self, offset: f64, now: Instant) -> bool {
        let Some(sample) = self.watcher.on_scroll(offset, now) else {
            return false;
        };
        let visible = self.mapper.visible_pages(sample.offset, self.viewport_height);
        let targets = target_pages(&self.mapper, &sample, self.viewport_height);
        tracing::debug!(
            offset = sample.offset,
            direction = ?sample.direction,
            ?targets,
            "handling scroll"
        );
        self.ensure_pages(&targets, &visible);
        true
    }

    /// Re-derive the visible window from the latest offset and request
    /// whatever it is missing.  Ignores the throttle and the hold.
    ///
    /// Returns the number of network requests this tick started.
    pub fn watchdog_tick(&mut self) -> usize {
        let max_pages = self.mapper.max_pages();
        let pages: Vec<Page> = self
            .mapper
            .visible_pages(self.watcher.current_offset(), self.viewport_height)
            .into_iter()
            .filter(|&p| p <= max_pages)
            .collect();
        let before = self.fetcher.issued();
        self.ensure_pages(&pages, &pages);
        let issued = (self.fetcher.issued() - before) as usize;
        if issued > 0 {
            tracing::debug!(?pages, issued, "watchdog requested missing pages");
        }
        issued
    }

    /// Slot and fetch every page in `pages`.  Pages outside `visible` only
    /// take a slot when one is free of visible pages; otherwise they are
    /// fetched into the cache alone.
    fn ensure_pages(&mut self, pages: &[Page], visible: &[Page]) {
        let mode = self.fetch_mode();
        for &page in pages {
            if visible.contains(&page) || self.slots.has_room_for(page, pages) {
                self.show_page(page, pages, mode);
            } else if self.fetch(page, mode).is_issued() {
                tracing::debug!(page, "prefetching without a slot");
            }
        }
    }

    fn show_page(&mut self, page: Page, keep: &[Page], mode: FetchMode) {
        if page == 0 || page > self.mapper.max_pages() {
            return;
        }
        if let Acquired::Evicted { dropped, .. } = self.slots.acquire_sparing(page, keep) {
            self.loading.clear(dropped);
        }
        match self.fetch(page, mode) {
            PageFetch::Ready(items) => {
                self.slots.attach(page, items);
                self.loading.clear(page);
            }
            PageFetch::Joined(_) | PageFetch::Issued(_) => self.mark_loading(page),
        }
    }

    fn fetch(&mut self, page: Page, mode: FetchMode) -> PageFetch<T> {
        let expected = self.mapper.items_on_page(page);
        self.fetcher.fetch_page(&mut self.cache, page, expected, mode)
    }

    fn fetch_mode(&self) -> FetchMode {
        if self.config.retry_failed {
            FetchMode::RetryFailed
        } else {
            FetchMode::Normal
        }
    }

    fn mark_loading(&mut self, page: Page) {
        self.slots.set_loading(page, true);
        let measured = self.slots.slot_for(page).and_then(|s| s.measured_height);
        self.loading.show(page, &self.mapper, measured);
    }

    // ───────────────────────────────────────── completions ───

    /// Fold one settled fetch into the engine.  Returns whether a slot now
    /// shows the new rows; a page nobody wants any more is cached only.
    pub fn apply_completion(&mut self, completion: FetchCompletion<T>) -> bool {
        let page = completion.page;
        let Some(items) = self.fetcher.complete(&mut self.cache, completion) else {
            return false;
        };
        self.loading.clear(page);
        let shown = self.slots.attach(page, items);
        if !shown {
            tracing::debug!(page, "page settled off-screen; cached only");
        }
        shown
    }

    // ───────────────────────────────────────── dataset ───────

    /// Switch to another dataset.  Cache, slot tags, indicators and
    /// in-flight bookkeeping are dropped together, and the visible window is
    /// requested from the new source.
    pub fn set_dataset(
        &mut self,
        dataset: impl Into<DatasetId>,
        total_items: usize,
        source: Arc<dyn PageSource<Item = T>>,
    ) -> usize {
        let dataset = dataset.into();
        self.fetcher.set_source(source);
        self.invalidate();
        self.config.total_items = total_items;
        self.mapper.set_total_items(total_items);
        self.watcher.reset();
        tracing::info!(
            %dataset,
            total_items,
            generation = self.fetcher.generation(),
            "switched dataset"
        );
        self.dataset = dataset;
        self.watchdog_tick()
    }

    /// Drop everything cached for the current dataset and request the
    /// visible window again.
    pub fn refresh(&mut self) -> usize {
        self.invalidate();
        tracing::info!(
            dataset = %self.dataset,
            generation = self.fetcher.generation(),
            "refreshing dataset"
        );
        self.watchdog_tick()
    }

    fn invalidate(&mut self) {
        self.fetcher.reset();
        self.cache.clear();
        self.slots.clear();
        self.loading.clear_all();
    }

    /// Request `page` again even if it is Loaded or Failed.  Joins a request
    /// already in flight instead of duplicating it.  Returns whether a new
    /// request was started.
    pub fn force_refetch(&mut self, page: Page) -> bool {
        if page == 0 || page > self.mapper.max_pages() {
            return false;
        }
        let issued = self.fetch(page, FetchMode::Force).is_issued();
        if self.slots.slot_for(page).is_some() {
            self.mark_loading(page);
        }
        issued
    }

    /// Whether Failed pages are requested again on the next scroll or tick.
    pub fn set_retry_failed(&mut self, retry: bool) {
        self.config.retry_failed = retry;
    }

    pub fn page_status(&self, page: Page) -> PageStatus {
        self.cache.status(page)
    }

    // ───────────────────────────────────────── geometry ──────

    /// Takes effect on the next scroll event or watchdog tick.
    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
    }

    /// Move every slot and indicator by the header change and hold scroll
    /// handling so the induced scroll is not treated as input.
    pub fn set_header_offset(
        &mut self,
        header_offset: f64,
        now: Instant,
    ) -> Result<(), EngineError> {
        if !header_offset.is_finite() {
            return Err(EngineError::InvalidHeaderOffset(header_offset));
        }
        let delta = header_offset - self.mapper.header_offset();
        self.mapper.set_header_offset(header_offset);
        self.config.header_offset = header_offset;
        self.loading.shift(delta);
        self.watcher.hold(now);
        Ok(())
    }

    /// Record the rendered height of the slot showing `page`.  An indicator
    /// over that page is re-centred on it.
    pub fn record_measured_height(&mut self, page: Page, height: f64) -> bool {
        if !height.is_finite() || height <= 0.0 {
            return false;
        }
        if !self.slots.set_measured_height(page, height) {
            return false;
        }
        if self.loading.is_loading(page) {
            self.loading.show(page, &self.mapper, Some(height));
        }
        true
    }

    // ───────────────────────────────────────── rows ──────────

    pub fn row(&self, index: usize) -> Option<RowView<'_, T>> {
        if index >= self.mapper.total_items() {
            return None;
        }
        let page = self.mapper.page_of_item(index);
        let start = self.mapper.item_range(page).start;
        let slot = self.slots.slot_for(page);
        let item = slot
            .and_then(|s| s.items.as_ref())
            .and_then(|items| items.get(index - start))
            .and_then(Option::as_ref);

        let offset = self.watcher.current_offset();
        let top = self.mapper.item_top(index);
        let visible =
            top + self.mapper.item_height() > offset && top < offset + self.viewport_height;
        let loading = slot.is_some_and(|s| s.loading) || self.loading.is_loading(page);

        Some(RowView {
            item,
            index,
            visible,
            loading,
        })
    }

    /// Rows intersecting the viewport, top to bottom.
    pub fn visible_rows(&self) -> Vec<RowView<'_, T>> {
        let offset = self.watcher.current_offset();
        let end = offset + self.viewport_height;
        let first = ((offset - self.mapper.header_offset()) / self.mapper.item_height())
            .floor()
            .max(0.0) as usize;
        (first..self.mapper.total_items())
            .take_while(|&index| self.mapper.item_top(index) < end)
            .filter_map(|index| self.row(index))
            .collect()
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            dataset: self.dataset.to_string(),
            generation: self.fetcher.generation(),
            current_page: self.current_page(),
            max_pages: self.mapper.max_pages(),
            slot_pages: self.slots.slots().iter().map(|s| s.tagged_page).collect(),
            loaded_pages: self.cache.pages_with(PageStatus::Loaded),
            failed_pages: self.cache.pages_with(PageStatus::Failed),
            pending_pages: self.fetcher.in_flight_pages(),
            requests_issued: self.fetcher.issued(),
        }
    }
}
