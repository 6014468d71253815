//! Busy indicators placed over pages whose fetch is in flight.
//!
//! Same cardinality as the slot pool.  An indicator is tagged with the page
//! it covers and centred on that page's extent.

use super::position::{Page, PositionMapper};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingIndicator {
    pub id: usize,
    pub page: Option<Page>,
    /// Vertical centre, in offset units.
    pub center: f64,
}

impl LoadingIndicator {
    pub fn is_active(&self) -> bool {
        self.page.is_some()
    }
}

#[derive(Debug)]
pub struct LoadingIndicatorPool {
    indicators: Vec<LoadingIndicator>,
}

impl LoadingIndicatorPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            indicators: (0..capacity.max(1))
                .map(|id| LoadingIndicator {
                    id,
                    page: None,
                    center: 0.0,
                })
                .collect(),
        }
    }

    /// Activate an indicator over `page`.  `measured` is the height of a
    /// render slot already placed for that page, when there is one.
    ///
    /// Returns the indicator id, or `None` when every indicator is busy.
    pub fn show(
        &mut self,
        page: Page,
        mapper: &PositionMapper,
        measured: Option<f64>,
    ) -> Option<usize> {
        let extent = measured
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or_else(|| nominal_extent(mapper, page));
        let center = mapper.offset_from_page(page) + extent / 2.0;

        let slot = match self.indicators.iter().position(|i| i.page == Some(page)) {
            Some(existing) => existing,
            None => match self.indicators.iter().position(|i| i.page.is_none()) {
                Some(free) => free,
                None => {
                    tracing::warn!(page, "all loading indicators are busy");
                    return None;
                }
            },
        };
        let indicator = &mut self.indicators[slot];
        indicator.page = Some(page);
        indicator.center = center;
        Some(indicator.id)
    }

    /// Deactivate the indicator over `page`.  Returns whether one was active.
    pub fn clear(&mut self, page: Page) -> bool {
        match self.indicators.iter_mut().find(|i| i.page == Some(page)) {
            Some(indicator) => {
                indicator.page = None;
                indicator.center = 0.0;
                true
            }
            None => false,
        }
    }

    /// Move every active indicator by `delta` (header offset change).
    pub fn shift(&mut self, delta: f64) {
        for indicator in self.indicators.iter_mut().filter(|i| i.is_active()) {
            indicator.center += delta;
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &LoadingIndicator> {
        self.indicators.iter().filter(|i| i.is_active())
    }

    pub fn is_loading(&self, page: Page) -> bool {
        self.indicators.iter().any(|i| i.page == Some(page))
    }

    pub fn clear_all(&mut self) {
        for indicator in &mut self.indicators {
            indicator.page = None;
            indicator.center = 0.0;
        }
    }
}

/// Full page height, or the trailing page's partial extent.
fn nominal_extent(mapper: &PositionMapper, page: Page) -> f64 {
    let extent = mapper.page_extent(page);
    if extent > 0.0 {
        extent
    } else {
        mapper.page_height()
    }
}
