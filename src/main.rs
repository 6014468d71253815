//! Terminal viewer for the page-window engine.
//!
//! Scroll a large synthetic (or HTTP-backed) dataset and watch its pages get
//! fetched, cached and recycled through a handful of render slots.

use std::io::{self, stderr};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use page_window::app::{
    engine::VirtualList,
    event::spawn_event_reader,
    fetcher::FetchCompletion,
    handler,
    state::{AppState, DatasetEntry, SourceKind},
};
use page_window::config::{ListConfig, ViewerConfig};
use page_window::ui::{layout::AppLayout, list_widget::ListWidget, theme::Theme};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    about = "Scroll a paginated dataset through a few recycled page slots"
)]
struct Cli {
    /// Rows in the first dataset; later datasets get proportionally fewer.
    #[arg(long, default_value_t = 10_000)]
    total: usize,

    /// Rows per page (overrides the config file).
    #[arg(long)]
    page_size: Option<usize>,

    /// Terminal lines per row.
    #[arg(long, default_value_t = 2.0)]
    item_height: f64,

    /// Base latency of the synthetic source.
    #[arg(long, default_value_t = 400)]
    latency_ms: u64,

    /// Make every n-th synthetic request fail.
    #[arg(long)]
    fail_every: Option<u64>,

    /// Fetch rows with `GET <url>?limit=&offset=` instead of generating them.
    #[arg(long)]
    url: Option<String>,

    /// Dataset identities that `n` rotates through.
    #[arg(long = "dataset", default_values = ["alpha", "beta", "gamma"])]
    datasets: Vec<String>,
}

/// Title and detail lines for one JSON row.
fn describe(row: &Value) -> (String, String) {
    let title = row
        .get("label")
        .and_then(Value::as_str)
        .map_or_else(|| row.to_string(), str::to_string);
    let detail = row
        .get("dataset")
        .and_then(Value::as_str)
        .map(|dataset| format!("dataset {dataset}"))
        .unwrap_or_default();
    (title, detail)
}

// ───────────────────────────────────────── main ─────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Silent unless RUST_LOG is set.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // ── engine ────────────────────────────────────────────────
    let datasets: Vec<DatasetEntry> = cli
        .datasets
        .iter()
        .enumerate()
        .map(|(i, name)| DatasetEntry {
            name: name.clone(),
            total_items: cli.total / (i + 1),
        })
        .collect();
    let first = datasets.first().cloned().unwrap_or_else(|| DatasetEntry {
        name: "default".into(),
        total_items: cli.total,
    });
    let source_kind = match cli.url {
        Some(url) => SourceKind::Http { url },
        None => SourceKind::Synthetic {
            latency: Duration::from_millis(cli.latency_ms),
            fail_every: cli.fail_every,
        },
    };

    let viewer_config = ViewerConfig::load();
    let mut list_config = ListConfig::new(first.total_items, cli.item_height);
    viewer_config.apply(&mut list_config);
    if let Some(page_size) = cli.page_size {
        list_config.page_size = page_size;
    }

    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel::<FetchCompletion<Value>>();
    let source = source_kind.build(&first);
    let list = VirtualList::new(list_config, first.name.clone(), source, fetch_tx)
        .context("invalid list configuration")?;
    let watchdog_every = list.config().watchdog_interval;
    let mut state = AppState::new(list, source_kind, datasets, viewer_config);

    // ── terminal setup ────────────────────────────────────────
    enable_raw_mode()?;
    let mut stderr_handle = stderr();
    execute!(stderr_handle, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stderr());
    let mut terminal = Terminal::new(backend)?;

    // ── async sources ─────────────────────────────────────────
    let mut events = spawn_event_reader(Duration::from_millis(100));
    let mut watchdog = tokio::time::interval(watchdog_every);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // ── event loop ────────────────────────────────────────────
    loop {
        state.advance_spinner(Instant::now());
        terminal.draw(|frame| {
            let layout = AppLayout::from_area(frame.area());
            state.set_viewport_rows(layout.viewport_rows());

            let info = state.list.debug_info();
            let block = Block::default()
                .title(format!(" {} · {} rows ", info.dataset, state.list.mapper().total_items()))
                .title_style(Theme::title_style())
                .borders(Borders::ALL)
                .border_style(Theme::border_style());
            let list = ListWidget::new(&state.list, describe)
                .tick(state.tick)
                .block(block);
            frame.render_widget(list, layout.list_area);

            let status = match state.status_message.as_deref() {
                Some(message) => format!(" {message} · {info}"),
                None => format!(" {info} · n next · R refresh · r refetch · f retry · q quit"),
            };
            let status_bar = Paragraph::new(status).style(Theme::status_bar_style());
            frame.render_widget(status_bar, layout.status_area);
        })?;

        tokio::select! {
            biased;

            Some(event) = events.recv() => handler::handle_event(&mut state, event),

            Some(completion) = fetch_rx.recv() => {
                // Apply everything that has settled before redrawing.
                state.list.apply_completion(completion);
                while let Ok(completion) = fetch_rx.try_recv() {
                    state.list.apply_completion(completion);
                }
            }

            _ = watchdog.tick() => {
                state.list.watchdog_tick();
            }
        }

        if state.should_quit {
            break;
        }
    }

    // ── teardown ──────────────────────────────────────────────
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    Ok(())
}
