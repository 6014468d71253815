//! Terminal event abstraction.
//!
//! A blocking reader task translates crossterm events into [`AppEvent`] and
//! forwards them over a channel, so the main loop only ever awaits.

use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEventKind};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Mouse wheel: positive scrolls down, negative up.
    Wheel(i8),
    Resize(u16, u16),
    Tick,
}

fn translate(ev: CtEvent) -> Option<AppEvent> {
    match ev {
        CtEvent::Key(k) => Some(AppEvent::Key(k)),
        CtEvent::Mouse(m) => match m.kind {
            MouseEventKind::ScrollDown => Some(AppEvent::Wheel(1)),
            MouseEventKind::ScrollUp => Some(AppEvent::Wheel(-1)),
            _ => None,
        },
        CtEvent::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        _ => None,
    }
}

/// Spawn the reader.  It emits [`AppEvent::Tick`] whenever `tick_rate`
/// passes without input and stops once the receiver is dropped.
pub fn spawn_event_reader(tick_rate: Duration) -> mpsc::UnboundedReceiver<AppEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            let next = match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(ev) => translate(ev),
                    Err(err) => {
                        tracing::warn!(error = %err, "terminal read failed");
                        None
                    }
                },
                Ok(false) => Some(AppEvent::Tick),
                Err(err) => {
                    tracing::warn!(error = %err, "terminal poll failed");
                    break;
                }
            };
            if let Some(app_event) = next {
                if tx.send(app_event).is_err() {
                    break;
                }
            }
        }
    });

    rx
}
