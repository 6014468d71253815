//! End-to-end scroll / watchdog / fetch scenarios against a gated source.
//!
//! Every page request blocks on its own semaphore, so each test decides
//! exactly when (and in which order) pages settle.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};

use page_window::app::fetcher::{FetchCompletion, FetchMode, PageFetch, PageFetcher};
use page_window::core::cache::{PageCache, PageStatus};
use page_window::{ListConfig, Page, PageSource, VirtualList};

// ───────────────────────────────────────── fixtures ──────────

/// Rows are `base + absolute index`.
struct GatedSource {
    base: usize,
    calls: Mutex<Vec<Page>>,
    gates: Mutex<HashMap<Page, Arc<Semaphore>>>,
    failing: Mutex<HashSet<Page>>,
}

impl GatedSource {
    fn new(base: usize) -> Arc<Self> {
        Arc::new(Self {
            base,
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    fn gate(&self, page: Page) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().unwrap();
        Arc::clone(gates.entry(page).or_insert_with(|| Arc::new(Semaphore::new(0))))
    }

    fn release(&self, page: Page) {
        self.gate(page).add_permits(1);
    }

    fn fail(&self, page: Page) {
        self.failing.lock().unwrap().insert(page);
    }

    fn calls(&self) -> Vec<Page> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageSource for GatedSource {
    type Item = usize;

    fn request_page(
        &self,
        page: Page,
        page_size: usize,
    ) -> BoxFuture<'static, anyhow::Result<Vec<usize>>> {
        self.calls.lock().unwrap().push(page);
        let gate = self.gate(page);
        let fails = self.failing.lock().unwrap().contains(&page);
        let start = self.base + (page - 1) * page_size;
        async move {
            gate.acquire_owned().await?.forget();
            if fails {
                anyhow::bail!("503 from upstream");
            }
            let rows: Vec<usize> = (start..start + page_size).collect();
            Ok(rows)
        }
        .boxed()
    }
}

type Completions = mpsc::UnboundedReceiver<FetchCompletion<usize>>;

/// 1000 rows of height 46, 20 per page (page height 920), 400-high viewport.
fn setup(
    source: &Arc<GatedSource>,
    configure: impl FnOnce(&mut ListConfig),
) -> (VirtualList<usize>, Completions) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut config = ListConfig::new(1000, 46.0);
    configure(&mut config);
    let source: Arc<dyn PageSource<Item = usize>> = source.clone();
    let mut list = VirtualList::new(config, "alpha", source, tx).expect("valid config");
    list.set_viewport_height(400.0);
    (list, rx)
}

async fn next_completion(rx: &mut Completions) -> FetchCompletion<usize> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("a page settled in time")
        .expect("channel open")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ───────────────────────────────────────── scenarios ─────────

#[tokio::test]
async fn fast_jump_is_caught_by_the_watchdog() {
    let source = GatedSource::new(0);
    let (mut list, _rx) = setup(&source, |_| {});
    let t0 = Instant::now();

    assert!(list.on_scroll(0.0, t0));
    assert_eq!(source.calls(), vec![1]);

    // Jump to the middle of page 5 inside the throttle window: dropped.
    assert!(!list.on_scroll(4280.0, t0 + ms(10)));
    assert_eq!(source.calls(), vec![1]);
    assert_eq!(list.page_status(5), PageStatus::NotRequested);

    // The next watchdog tick wants page 5 plus its lookahead.
    assert_eq!(list.watchdog_tick(), 2);
    assert_eq!(source.calls(), vec![1, 5, 6]);
    assert_eq!(list.page_status(5), PageStatus::Pending);
    assert_eq!(list.page_status(2), PageStatus::NotRequested);
}

#[tokio::test]
async fn positions_past_the_end_clamp_to_the_last_page() {
    let source = GatedSource::new(0);
    let (mut list, _rx) = setup(&source, |c| c.total_items = 45);
    let mapper = *list.mapper();
    assert_eq!(mapper.max_pages(), 3);
    assert_eq!(mapper.page_from_offset(mapper.offset_from_page(4)), 3);

    assert!(list.on_scroll(1.0e9, Instant::now()));
    assert_eq!(list.current_page(), 3);
    assert_eq!(source.calls(), vec![3]);
    assert!(!list.force_refetch(4));
}

#[tokio::test]
async fn concurrent_requests_for_a_page_make_one_call() {
    let source = GatedSource::new(0);
    let (tx, _rx) = mpsc::unbounded_channel();
    let dyn_source: Arc<dyn PageSource<Item = usize>> = source.clone();
    let mut fetcher = PageFetcher::new(dyn_source, 20, tx);
    let mut cache = PageCache::new(20);

    let first = fetcher.fetch_page(&mut cache, 2, 20, FetchMode::Normal);
    let second = fetcher.fetch_page(&mut cache, 2, 20, FetchMode::Normal);
    assert!(first.is_issued());
    assert!(matches!(second, PageFetch::Joined(_)));
    assert_eq!(source.calls(), vec![2]);

    // Both callers see the same rows once the single call settles.
    source.release(2);
    let (PageFetch::Issued(a), PageFetch::Joined(b)) = (first, second) else {
        panic!("unexpected fetch outcomes");
    };
    assert_eq!((a.page(), b.page()), (2, 2));
    let (a, b) = tokio::join!(a.rows(), b.rows());
    assert_eq!(a, b);
    assert_eq!(a[0], Some(20));
}

#[tokio::test]
async fn repeated_ticks_do_not_duplicate_requests() {
    let source = GatedSource::new(0);
    let (mut list, mut rx) = setup(&source, |_| {});

    assert_eq!(list.watchdog_tick(), 1);
    assert_eq!(list.watchdog_tick(), 0);
    assert!(list.on_scroll(10.0, Instant::now()));
    assert_eq!(source.calls(), vec![1]);
    assert_eq!(list.debug_info().pending_pages, vec![1]);

    source.release(1);
    assert!(list.apply_completion(next_completion(&mut rx).await));
    assert_eq!(list.watchdog_tick(), 0);
    assert_eq!(list.requests_issued(), 1);
}

#[tokio::test]
async fn scrolling_within_a_shown_page_keeps_its_rows() {
    let source = GatedSource::new(0);
    let (mut list, mut rx) = setup(&source, |_| {});
    let t0 = Instant::now();

    list.on_scroll(0.0, t0);
    source.release(1);
    list.apply_completion(next_completion(&mut rx).await);
    let shown = list.slots()[0].items.clone().expect("rows attached");

    list.on_scroll(46.0, t0 + ms(100));
    list.watchdog_tick();
    let still = list.slots()[0].items.clone().expect("rows attached");
    assert!(Arc::ptr_eq(&shown, &still));
    assert_eq!(list.slots()[0].tagged_page, Some(1));
}

#[tokio::test]
async fn switching_datasets_drops_everything_from_the_old_one() {
    let alpha = GatedSource::new(0);
    let beta = GatedSource::new(10_000);
    let (mut list, mut rx) = setup(&alpha, |_| {});

    list.watchdog_tick();
    assert_eq!(list.page_status(1), PageStatus::Pending);

    let beta_source: Arc<dyn PageSource<Item = usize>> = beta.clone();
    assert_eq!(list.set_dataset("beta", 500, beta_source), 1);
    assert_eq!(list.dataset().as_str(), "beta");
    assert_eq!(list.generation(), 1);
    assert_eq!(beta.calls(), vec![1]);
    assert_eq!(list.mapper().max_pages(), 25);

    // The old request settles late and is ignored.
    alpha.release(1);
    assert!(!list.apply_completion(next_completion(&mut rx).await));
    assert_eq!(list.page_status(1), PageStatus::Pending);

    beta.release(1);
    assert!(list.apply_completion(next_completion(&mut rx).await));
    assert_eq!(list.row(0).and_then(|r| r.item), Some(&10_000));
    assert_eq!(list.debug_info().slot_pages, vec![Some(1), None, None]);
}

#[tokio::test]
async fn late_result_for_an_evicted_page_is_cached_not_shown() {
    let source = GatedSource::new(0);
    let (mut list, mut rx) = setup(&source, |c| c.slot_count = 1);
    let t0 = Instant::now();

    list.on_scroll(0.0, t0);
    assert_eq!(list.indicators().count(), 1);

    // Page 5 takes the only slot; page 6 is prefetched without one.
    assert!(list.on_scroll(3780.0, t0 + ms(100)));
    assert_eq!(source.calls(), vec![1, 5, 6]);
    assert_eq!(list.debug_info().slot_pages, vec![Some(5)]);
    assert!(list.indicators().all(|i| i.page == Some(5)));

    source.release(1);
    assert!(!list.apply_completion(next_completion(&mut rx).await));
    assert_eq!(list.page_status(1), PageStatus::Loaded);
    assert!(list.slots()[0].items.is_none());

    // Coming back is instant: no new request.
    assert!(list.on_scroll(0.0, t0 + ms(200)));
    assert_eq!(list.requests_issued(), 3);
    let row = list.row(0).expect("in range");
    assert_eq!(row.item, Some(&0));
    assert!(!row.loading);
}

#[tokio::test]
async fn completions_apply_in_completion_order() {
    let source = GatedSource::new(0);
    let (mut list, mut rx) = setup(&source, |_| {});

    assert!(list.on_scroll(600.0, Instant::now()));
    assert_eq!(source.calls(), vec![1, 2]);

    source.release(2);
    let completion = next_completion(&mut rx).await;
    assert_eq!(completion.page, 2);
    assert!(list.apply_completion(completion));
    assert_eq!(list.row(20).and_then(|r| r.item), Some(&20));
    assert!(list.row(19).is_some_and(|r| r.loading && r.item.is_none()));

    source.release(1);
    assert!(list.apply_completion(next_completion(&mut rx).await));
    let rows = list.visible_rows();
    assert!(rows.iter().all(|r| r.item.is_some() && !r.loading));
}

#[tokio::test]
async fn failed_pages_render_blank_and_stay_failed() {
    let source = GatedSource::new(0);
    let (mut list, mut rx) = setup(&source, |_| {});
    source.fail(1);

    list.watchdog_tick();
    source.release(1);
    assert!(list.apply_completion(next_completion(&mut rx).await));
    assert_eq!(list.page_status(1), PageStatus::Failed);
    let row = list.row(0).expect("in range");
    assert!(row.item.is_none());
    assert!(!row.loading);
    assert_eq!(list.debug_info().failed_pages, vec![1]);

    // Sticky by default.
    assert_eq!(list.watchdog_tick(), 0);
    assert_eq!(source.calls(), vec![1]);

    // Opting in makes the watchdog try again.
    list.set_retry_failed(true);
    assert_eq!(list.watchdog_tick(), 1);
    assert_eq!(source.calls(), vec![1, 1]);
    assert_eq!(list.watchdog_tick(), 0);
}

#[tokio::test]
async fn forced_refetch_leaves_failed_state() {
    let source = GatedSource::new(0);
    let (mut list, mut rx) = setup(&source, |_| {});
    source.fail(1);
    list.watchdog_tick();
    source.release(1);
    list.apply_completion(next_completion(&mut rx).await);

    source.failing.lock().unwrap().clear();
    assert!(list.force_refetch(1));
    source.release(1);
    assert!(list.apply_completion(next_completion(&mut rx).await));
    assert_eq!(list.page_status(1), PageStatus::Loaded);
    assert_eq!(list.row(5).and_then(|r| r.item), Some(&5));
}
