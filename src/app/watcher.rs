//! Scroll sampling: throttle, re-entrancy hold, direction and target pages.
//!
//! The watcher only decides *whether* a scroll event is handled and *which*
//! pages it wants.  The watchdog path never goes through the throttle or the
//! hold; it reads [`ScrollWatcher::current_offset`] directly.

use std::time::{Duration, Instant};

use crate::core::position::{Page, PositionMapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One handled scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
    pub offset: f64,
    pub direction: Direction,
    pub timestamp: Instant,
}

#[derive(Debug)]
pub struct ScrollWatcher {
    /// Offset of the last *handled* event; direction is measured against it.
    last_offset: f64,
    /// Latest offset seen, handled or not.
    current_offset: f64,
    throttle: Duration,
    hold: Duration,
    last_handled: Option<Instant>,
    held_until: Option<Instant>,
}

impl ScrollWatcher {
    pub fn new(throttle: Duration, hold: Duration) -> Self {
        Self {
            last_offset: 0.0,
            current_offset: 0.0,
            throttle,
            hold,
            last_handled: None,
            held_until: None,
        }
    }

    pub fn current_offset(&self) -> f64 {
        self.current_offset
    }

    /// Feed a scroll event.  The offset is always recorded; the event is
    /// handled only outside the throttle window and any active hold.
    /// Dropped events are not queued.
    pub fn on_scroll(&mut self, offset: f64, now: Instant) -> Option<ViewportSample> {
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        self.current_offset = offset;

        if self.held_until.is_some_and(|until| now < until) {
            return None;
        }
        if self
            .last_handled
            .is_some_and(|at| now.saturating_duration_since(at) < self.throttle)
        {
            return None;
        }

        let direction = if offset > self.last_offset {
            Direction::Down
        } else {
            Direction::Up
        };
        self.last_offset = offset;
        self.last_handled = Some(now);
        self.hold(now);

        Some(ViewportSample {
            offset,
            direction,
            timestamp: now,
        })
    }

    /// Ignore scroll events until `now + hold`.  Used around changes the
    /// engine makes itself so the induced scroll is not treated as input.
    pub fn hold(&mut self, now: Instant) {
        let until = now + self.hold;
        self.held_until = Some(self.held_until.map_or(until, |held| held.max(until)));
    }

    pub fn is_held(&self, now: Instant) -> bool {
        self.held_until.is_some_and(|until| now < until)
    }

    /// Back to the top with no throttle or hold pending.
    pub fn reset(&mut self) {
        self.last_offset = 0.0;
        self.current_offset = 0.0;
        self.last_handled = None;
        self.held_until = None;
    }
}

/// Pages a handled scroll event wants, most important first: the page under
/// the offset, the rest of the visible window, then the neighbour in the
/// scroll direction.  No duplicates, nothing outside `1..=max_pages`.
pub fn target_pages(
    mapper: &PositionMapper,
    sample: &ViewportSample,
    viewport_height: f64,
) -> Vec<Page> {
    let current = mapper.page_from_offset(sample.offset);
    let mut pages = vec![current];
    for page in mapper.visible_pages(sample.offset, viewport_height) {
        if !pages.contains(&page) {
            pages.push(page);
        }
    }

    let neighbour = match sample.direction {
        Direction::Down => Some(current + 1),
        Direction::Up => current.checked_sub(1),
    };
    if let Some(page) = neighbour.filter(|&p| p >= 1 && p <= mapper.max_pages()) {
        if !pages.contains(&page) {
            pages.push(page);
        }
    }
    pages.retain(|&p| p <= mapper.max_pages());
    pages
}
