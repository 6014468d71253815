//! Fixed pool of reusable render slots.
//!
//! Slots live in a flat `Vec` and are addressed by index, the same arena
//! pattern the rest of the crate uses.  A slot shows at most one page; no two
//! slots are ever tagged with the same page.

use super::cache::PageItems;
use super::position::Page;

/// Index into [`SlotPool::slots`].
pub type SlotId = usize;

/// One reusable render container.
#[derive(Debug, Clone)]
pub struct RenderSlot<T> {
    pub id: SlotId,
    pub tagged_page: Option<Page>,
    /// Rows currently shown.  `None` between tagging and data arrival.
    pub items: Option<PageItems<T>>,
    pub loading: bool,
    /// Height reported by the renderer once the slot has been placed.
    pub measured_height: Option<f64>,
}

impl<T> RenderSlot<T> {
    fn empty(id: SlotId) -> Self {
        Self {
            id,
            tagged_page: None,
            items: None,
            loading: false,
            measured_height: None,
        }
    }

    fn retag(&mut self, page: Page) {
        self.tagged_page = Some(page);
        self.items = None;
        self.loading = false;
        self.measured_height = None;
    }

    pub fn is_free(&self) -> bool {
        self.tagged_page.is_none()
    }
}

/// How [`SlotPool::acquire`] satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// The page was already tagged; the slot is untouched.
    Existing(SlotId),
    /// An untagged slot was claimed.
    Fresh(SlotId),
    /// A tagged slot was cleared and retagged; carries the page it dropped.
    Evicted { slot: SlotId, dropped: Page },
}

impl Acquired {
    pub fn slot(self) -> SlotId {
        match self {
            Self::Existing(id) | Self::Fresh(id) => id,
            Self::Evicted { slot, .. } => slot,
        }
    }
}

#[derive(Debug)]
pub struct SlotPool<T> {
    slots: Vec<RenderSlot<T>>,
}

impl<T> SlotPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity.max(1)).map(RenderSlot::empty).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[RenderSlot<T>] {
        &self.slots
    }

    pub fn get(&self, id: SlotId) -> Option<&RenderSlot<T>> {
        self.slots.get(id)
    }

    /// Slot currently tagged with `page`.
    pub fn slot_for(&self, page: Page) -> Option<&RenderSlot<T>> {
        self.slots.iter().find(|s| s.tagged_page == Some(page))
    }

    fn slot_for_mut(&mut self, page: Page) -> Option<&mut RenderSlot<T>> {
        self.slots.iter_mut().find(|s| s.tagged_page == Some(page))
    }

    /// Give `page` a slot: its existing slot, else a free one, else the slot
    /// whose page is furthest from `page` (ties go to the lowest index).
    pub fn acquire(&mut self, page: Page) -> Acquired {
        self.acquire_sparing(page, &[])
    }

    /// Like [`acquire`](Self::acquire), but never evicts a slot tagged with
    /// one of `keep` while another candidate exists.
    pub fn acquire_sparing(&mut self, page: Page, keep: &[Page]) -> Acquired {
        if let Some(slot) = self.slot_for(page) {
            return Acquired::Existing(slot.id);
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_free()) {
            slot.retag(page);
            return Acquired::Fresh(slot.id);
        }

        let victim = furthest(&self.slots, page, |p| !keep.contains(&p))
            .or_else(|| furthest(&self.slots, page, |_| true))
            .unwrap_or(0);
        let slot = &mut self.slots[victim];
        let dropped = slot.tagged_page.unwrap_or_default();
        slot.retag(page);
        tracing::debug!(slot = victim, dropped, page, "evicted render slot");
        Acquired::Evicted {
            slot: victim,
            dropped,
        }
    }

    /// Whether `page` could get a slot without displacing any page in `keep`.
    pub fn has_room_for(&self, page: Page, keep: &[Page]) -> bool {
        self.slots.iter().any(|s| match s.tagged_page {
            None => true,
            Some(tagged) => tagged == page || !keep.contains(&tagged),
        })
    }

    /// Attach settled rows to the slot showing `page`.  Returns `false` when
    /// no slot wants that page any more.
    pub fn attach(&mut self, page: Page, items: PageItems<T>) -> bool {
        match self.slot_for_mut(page) {
            Some(slot) => {
                slot.items = Some(items);
                slot.loading = false;
                true
            }
            None => false,
        }
    }

    pub fn set_loading(&mut self, page: Page, loading: bool) {
        if let Some(slot) = self.slot_for_mut(page) {
            slot.loading = loading;
        }
    }

    pub fn set_measured_height(&mut self, page: Page, height: f64) -> bool {
        match self.slot_for_mut(page) {
            Some(slot) => {
                slot.measured_height = Some(height);
                true
            }
            None => false,
        }
    }

    /// Pages currently tagged, in slot order.
    pub fn tagged_pages(&self) -> Vec<Page> {
        self.slots.iter().filter_map(|s| s.tagged_page).collect()
    }

    /// Untag every slot.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = RenderSlot::empty(slot.id);
        }
    }
}

/// Index of the tagged slot with the largest page distance among those whose
/// page passes `eligible`.  Strict comparison keeps the lowest index on ties.
fn furthest<T>(
    slots: &[RenderSlot<T>],
    page: Page,
    eligible: impl Fn(Page) -> bool,
) -> Option<SlotId> {
    let mut best: Option<(SlotId, usize)> = None;
    for slot in slots {
        let Some(tagged) = slot.tagged_page else {
            continue;
        };
        if !eligible(tagged) {
            continue;
        }
        let distance = tagged.abs_diff(page);
        if best.map_or(true, |(_, d)| distance > d) {
            best = Some((slot.id, distance));
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn items(values: &[u32]) -> PageItems<u32> {
        values.iter().copied().map(Some).collect::<Vec<_>>().into()
    }

    #[test]
    fn free_slots_are_claimed_in_order() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        assert_eq!(pool.acquire(4), Acquired::Fresh(0));
        assert_eq!(pool.acquire(5), Acquired::Fresh(1));
        assert_eq!(pool.acquire(6), Acquired::Fresh(2));
        assert_eq!(pool.tagged_pages(), vec![4, 5, 6]);
    }

    #[test]
    fn reacquiring_a_tagged_page_keeps_its_content() {
        let mut pool = SlotPool::new(3);
        pool.acquire(2);
        let rows = items(&[1, 2, 3]);
        assert!(pool.attach(2, Arc::clone(&rows)));

        assert_eq!(pool.acquire(2), Acquired::Existing(0));
        assert_eq!(pool.acquire(2), Acquired::Existing(0));
        let shown = pool.slot_for(2).and_then(|s| s.items.clone());
        assert!(shown.is_some_and(|s| Arc::ptr_eq(&s, &rows)));
    }

    #[test]
    fn eviction_takes_the_most_distant_page() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        pool.acquire(1);
        pool.acquire(2);
        pool.acquire(3);
        assert_eq!(pool.acquire(4), Acquired::Evicted { slot: 0, dropped: 1 });
        assert_eq!(pool.tagged_pages(), vec![4, 2, 3]);
        assert_eq!(pool.acquire(1), Acquired::Evicted { slot: 0, dropped: 4 });
    }

    #[test]
    fn eviction_ties_go_to_lowest_index() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        pool.acquire(3);
        pool.acquire(7);
        pool.acquire(4);
        assert_eq!(pool.acquire(5), Acquired::Evicted { slot: 0, dropped: 3 });

        let mut pool: SlotPool<u32> = SlotPool::new(2);
        pool.acquire(9);
        pool.acquire(1);
        assert_eq!(pool.acquire(5), Acquired::Evicted { slot: 0, dropped: 9 });
    }

    #[test]
    fn eviction_clears_stale_content() {
        let mut pool = SlotPool::new(1);
        pool.acquire(1);
        pool.attach(1, items(&[9]));
        pool.set_loading(1, true);
        pool.set_measured_height(1, 12.0);

        pool.acquire(8);
        let slot = pool.slot_for(8).unwrap();
        assert!(slot.items.is_none());
        assert!(!slot.loading);
        assert!(slot.measured_height.is_none());
        assert!(!pool.attach(1, items(&[9])));
    }

    #[test]
    fn sparing_skips_protected_pages_when_possible() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        pool.acquire(6);
        pool.acquire(5);
        pool.acquire(8);
        // Plain rule would drop 5 (distance 2) for page 7.
        assert_eq!(pool.acquire_sparing(7, &[5, 6, 7]), Acquired::Evicted { slot: 2, dropped: 8 });
        // Everything protected: fall back to the plain rule.
        assert_eq!(pool.acquire_sparing(9, &[5, 6, 7]), Acquired::Evicted { slot: 1, dropped: 5 });
    }

    #[test]
    fn room_check_respects_protected_pages() {
        let mut pool: SlotPool<u32> = SlotPool::new(2);
        assert!(pool.has_room_for(1, &[]));
        pool.acquire(1);
        pool.acquire(2);
        assert!(!pool.has_room_for(3, &[1, 2]));
        assert!(pool.has_room_for(2, &[1, 2]));
        assert!(pool.has_room_for(3, &[2]));
    }

    #[test]
    fn clear_untags_all_slots() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        pool.acquire(1);
        pool.acquire(2);
        pool.clear();
        assert!(pool.slots().iter().all(RenderSlot::is_free));
        assert_eq!(pool.acquire(9), Acquired::Fresh(0));
    }
}
