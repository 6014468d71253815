//! Page cache: page number → fetched items plus per-page fetch status.
//!
//! Entries are created the first time a page is requested and only dropped
//! by [`PageCache::clear`] (dataset identity change).  Item arrays are always
//! exactly `page_size` long; missing rows are `None`.

use std::collections::HashMap;
use std::sync::Arc;

use super::position::Page;

/// Shared, immutable row storage for one page.
pub type PageItems<T> = Arc<[Option<T>]>;

/// Where a page is in its fetch lifecycle.
///
/// `NotRequested → Pending → {Loaded, Failed}`.  A forced refetch moves a
/// settled page back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageStatus {
    #[default]
    NotRequested,
    Pending,
    Loaded,
    Failed,
}

impl PageStatus {
    /// Loaded or Failed.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }
}

/// One cached page.
#[derive(Debug, Clone)]
pub struct PageEntry<T> {
    pub page: Page,
    pub items: PageItems<T>,
    pub status: PageStatus,
}

/// Cache for one dataset session.  `page_size` is fixed for its lifetime.
#[derive(Debug)]
pub struct PageCache<T> {
    page_size: usize,
    entries: HashMap<Page, PageEntry<T>>,
}

impl<T> PageCache<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn status(&self, page: Page) -> PageStatus {
        self.entries
            .get(&page)
            .map_or(PageStatus::NotRequested, |e| e.status)
    }

    pub fn get(&self, page: Page) -> Option<&PageEntry<T>> {
        self.entries.get(&page)
    }

    /// Items for a settled page.  Pending pages have nothing fresh to show.
    pub fn settled_items(&self, page: Page) -> Option<PageItems<T>> {
        self.entries
            .get(&page)
            .filter(|e| e.status.is_settled())
            .map(|e| Arc::clone(&e.items))
    }

    /// True when `page` is Loaded and every row it should hold is present.
    /// `expected` is the number of real rows on the page (short for the
    /// trailing page).
    pub fn covers(&self, page: Page, expected: usize) -> bool {
        let Some(entry) = self.entries.get(&page) else {
            return false;
        };
        entry.status == PageStatus::Loaded
            && entry
                .items
                .iter()
                .take(expected.min(self.page_size))
                .all(Option::is_some)
    }

    /// Flag `page` as having a request in flight.  Items from an earlier
    /// settled fetch stay in place until the new result replaces them whole.
    pub fn mark_pending(&mut self, page: Page) {
        let page_size = self.page_size;
        self.entries
            .entry(page)
            .and_modify(|e| e.status = PageStatus::Pending)
            .or_insert_with(|| PageEntry {
                page,
                items: empty_items(page_size),
                status: PageStatus::Pending,
            });
    }

    /// Replace `page` with a fresh result, padded or truncated to
    /// `page_size`.
    pub fn store_loaded(&mut self, page: Page, rows: impl IntoIterator<Item = T>) -> PageItems<T> {
        let items = padded_items(rows, self.page_size);
        self.entries.insert(
            page,
            PageEntry {
                page,
                items: Arc::clone(&items),
                status: PageStatus::Loaded,
            },
        );
        items
    }

    /// Record a failed fetch as an all-`None` page.
    pub fn store_failed(&mut self, page: Page) -> PageItems<T> {
        let items = empty_items(self.page_size);
        self.entries.insert(
            page,
            PageEntry {
                page,
                items: Arc::clone(&items),
                status: PageStatus::Failed,
            },
        );
        items
    }

    pub fn pages_with(&self, status: PageStatus) -> Vec<Page> {
        let mut pages: Vec<Page> = self
            .entries
            .values()
            .filter(|e| e.status == status)
            .map(|e| e.page)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A page of `None` rows.
pub fn empty_items<T>(page_size: usize) -> PageItems<T> {
    (0..page_size).map(|_| None).collect()
}

/// `rows` padded with `None` (or truncated) to exactly `page_size`.
pub fn padded_items<T>(rows: impl IntoIterator<Item = T>, page_size: usize) -> PageItems<T> {
    let mut padded: Vec<Option<T>> = rows.into_iter().take(page_size).map(Some).collect();
    padded.resize_with(page_size, || None);
    padded.into()
}
