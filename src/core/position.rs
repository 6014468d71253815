//! Scroll offset ↔ page ↔ pixel arithmetic.
//!
//! Everything here is pure.  Offsets are in the same unit as `item_height`
//! (pixels in a browser, terminal rows in the bundled viewer).

use std::ops::Range;

/// 1-based page number.
pub type Page = usize;

/// Slack added before flooring so that `offset_from_page(p)` maps back to
/// `p` even when `page_height` is not exactly representable.
const EPSILON: f64 = 1e-9;

/// Geometry of one dataset inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMapper {
    total_items: usize,
    page_size: usize,
    item_height: f64,
    header_offset: f64,
}

impl PositionMapper {
    /// Callers validate the inputs first (see `ListConfig::validate`).
    pub fn new(total_items: usize, page_size: usize, item_height: f64, header_offset: f64) -> Self {
        Self {
            total_items,
            page_size: page_size.max(1),
            item_height,
            header_offset,
        }
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn header_offset(&self) -> f64 {
        self.header_offset
    }

    pub fn set_header_offset(&mut self, header_offset: f64) {
        self.header_offset = header_offset;
    }

    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
    }

    /// Nominal height of a full page.
    pub fn page_height(&self) -> f64 {
        self.page_size as f64 * self.item_height
    }

    /// `ceil(total_items / page_size)`; zero for an empty dataset.
    pub fn max_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size)
    }

    /// Highest page a position can map to (never below 1).
    pub fn last_page(&self) -> Page {
        self.max_pages().max(1)
    }

    /// Full scrollable extent including the header.
    pub fn total_height(&self) -> f64 {
        self.total_items as f64 * self.item_height + self.header_offset
    }

    /// Page under `offset`.  Negative or non-finite offsets fall back to the
    /// first page; offsets past the end clamp to the last page.
    pub fn page_from_offset(&self, offset: f64) -> Page {
        let offset = sanitize(offset);
        let within = (offset - self.header_offset).max(0.0);
        let raw = (within / self.page_height() + EPSILON).floor() + 1.0;
        if !raw.is_finite() {
            return 1;
        }
        (raw as usize).clamp(1, self.last_page())
    }

    /// Top edge of `page`.
    pub fn offset_from_page(&self, page: Page) -> f64 {
        self.page_height() * page.saturating_sub(1) as f64 + self.header_offset
    }

    /// Pages that should be on screen for a viewport at `offset`: the page
    /// under the offset, its predecessor when that page's bottom edge lies in
    /// the viewport, and its successor when that page's top edge does.
    pub fn visible_pages(&self, offset: f64, viewport_height: f64) -> Vec<Page> {
        let offset = sanitize(offset).max(0.0);
        let viewport_height = sanitize(viewport_height).max(0.0);
        let end = offset + viewport_height;
        let page = self.page_from_offset(offset);

        let mut pages = Vec::with_capacity(3);
        if page > 1 {
            let prev_bottom = self.offset_from_page(page);
            if prev_bottom >= offset && prev_bottom < end {
                pages.push(page - 1);
            }
        }
        pages.push(page);
        let next = page + 1;
        if next <= self.max_pages() {
            let next_top = self.offset_from_page(next);
            if next_top >= offset && next_top < end {
                pages.push(next);
            }
        }
        pages
    }

    /// Number of real items on `page` (short for the trailing page, zero past
    /// the end).
    pub fn items_on_page(&self, page: Page) -> usize {
        self.item_range(page).len()
    }

    /// Absolute item indices covered by `page`.
    pub fn item_range(&self, page: Page) -> Range<usize> {
        let start = page.saturating_sub(1).saturating_mul(self.page_size);
        let start = start.min(self.total_items);
        let end = start.saturating_add(self.page_size).min(self.total_items);
        start..end
    }

    /// Page holding absolute item `index`.
    pub fn page_of_item(&self, index: usize) -> Page {
        index / self.page_size + 1
    }

    /// Top edge of absolute item `index`.
    pub fn item_top(&self, index: usize) -> f64 {
        self.header_offset + index as f64 * self.item_height
    }

    /// Nominal extent of `page`: a full page, or the trailing partial page.
    pub fn page_extent(&self, page: Page) -> f64 {
        self.items_on_page(page) as f64 * self.item_height
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
