//! The notifier loop: Watching mode backed by the `notify` crate, with a
//! trailing-edge debounce and a safety ticker, falling back to Polling
//! mode on watcher init failure or a reported watcher error.
//!
//! The `notify` crate's callback runs on its own thread, so events are
//! bridged into an async channel via `spawn_blocking`, watching only the
//! two directories this store cares about.

use crate::notifier::stateless_tracker::StatelessTracker;
use crate::notifier::tick::run_tick;
use agentmail_core::multiplexer::Multiplexer;
use agentmail_core::store::StoreLayout;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEBOUNCE_WINDOW: StdDuration = StdDuration::from_millis(500);
const SAFETY_TICK: StdDuration = StdDuration::from_secs(60);
const POLL_INTERVAL: StdDuration = StdDuration::from_secs(10);
const BRIDGE_POLL: StdDuration = StdDuration::from_millis(100);

enum WatchSignal {
    Changed,
    Error(String),
}

/// Run the notifier loop until `cancel` fires. Never returns an error:
/// failures degrade to Polling mode rather than aborting the daemon.
pub async fn run<M: Multiplexer + Send + Sync + 'static>(
    layout: StoreLayout,
    mux: M,
    tracker: StatelessTracker,
    cancel: CancellationToken,
) {
    match start_watcher(&layout) {
        Ok((_watcher, rx)) => {
            info!("notifier: watching {} for changes", layout.root().display());
            run_watching(layout, mux, tracker, rx, cancel).await;
        }
        Err(e) => {
            warn!("file watching unavailable, using polling: {e}");
            run_polling(layout, mux, tracker, cancel).await;
        }
    }
}

fn start_watcher(
    layout: &StoreLayout,
) -> notify::Result<(RecommendedWatcher, mpsc::Receiver<WatchSignal>)> {
    let (std_tx, std_rx) = channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = std_tx.send(res);
    })?;
    watcher.watch(layout.root(), RecursiveMode::Recursive)?;

    let (tx, rx) = mpsc::channel(64);
    tokio::task::spawn_blocking(move || {
        loop {
            match std_rx.recv_timeout(BRIDGE_POLL) {
                Ok(Ok(_event)) => {
                    if tx.blocking_send(WatchSignal::Changed).is_err() {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    let _ = tx.blocking_send(WatchSignal::Error(e.to_string()));
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    Ok((watcher, rx))
}

async fn run_watching<M: Multiplexer>(
    layout: StoreLayout,
    mux: M,
    tracker: StatelessTracker,
    mut events: mpsc::Receiver<WatchSignal>,
    cancel: CancellationToken,
) {
    // Trailing-edge debounce: each `Changed` signal pushes the deadline
    // DEBOUNCE_WINDOW further out; the tick only runs once the stream of
    // events goes quiet for that long.
    let mut debounce_deadline: Option<tokio::time::Instant> = None;
    let mut safety = tokio::time::interval(SAFETY_TICK);

    loop {
        let debounce_wait = async {
            match debounce_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("notifier: stop signal received, exiting watching mode");
                return;
            }
            signal = events.recv() => {
                match signal {
                    Some(WatchSignal::Changed) => {
                        debounce_deadline = Some(tokio::time::Instant::now() + DEBOUNCE_WINDOW);
                    }
                    Some(WatchSignal::Error(e)) => {
                        error!("file watcher error, switching to polling: {e}");
                        drop(events);
                        run_polling(layout, mux, tracker, cancel).await;
                        return;
                    }
                    None => {
                        warn!("file watcher channel closed, switching to polling");
                        run_polling(layout, mux, tracker, cancel).await;
                        return;
                    }
                }
            }
            _ = debounce_wait => {
                debounce_deadline = None;
                fire_tick(&layout, &mux, &tracker);
            }
            _ = safety.tick() => {
                fire_tick(&layout, &mux, &tracker);
            }
        }
    }
}

async fn run_polling<M: Multiplexer>(
    layout: StoreLayout,
    mux: M,
    tracker: StatelessTracker,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("notifier: stop signal received, exiting polling mode");
                return;
            }
            _ = ticker.tick() => {
                fire_tick(&layout, &mux, &tracker);
            }
        }
    }
}

fn fire_tick<M: Multiplexer>(layout: &StoreLayout, mux: &M, tracker: &StatelessTracker) {
    let report = run_tick(layout, mux, tracker, chrono::Utc::now());
    if !report.stated_notified.is_empty() || !report.stateless_notified.is_empty() {
        debug!(
            "notifier tick: {} stated, {} stateless",
            report.stated_notified.len(),
            report.stateless_notified.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeMultiplexer;
    use agentmail_core::ledger;
    use agentmail_core::ledger::Status;
    use agentmail_core::mailbox;
    use agentmail_core::message::Message;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn polling_mode_delivers_on_its_own_cadence() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let now = chrono::Utc::now();
        ledger::update_status(&layout, "bob", Status::Ready, false, now).unwrap();
        mailbox::append(
            &layout,
            "bob",
            &Message {
                id: "aaaaaaaa".to_string(),
                from: "alice".to_string(),
                to: "bob".to_string(),
                message: "hi".to_string(),
                read_flag: false,
            },
        )
        .unwrap();

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        fire_tick(&layout, &mux, &tracker);

        let states = ledger::read_all(&layout).unwrap();
        assert!(states[0].notified_at.is_some());
        let _ = Duration::from_millis(0);
    }

    #[tokio::test]
    async fn cancellation_stops_polling_loop_promptly() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let mux = FakeMultiplexer::default();
        let tracker = StatelessTracker::new();
        let cancel = CancellationToken::new();

        let cancel2 = cancel.clone();
        let handle = tokio::spawn(run_polling(layout, mux, tracker, cancel2));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("polling loop should exit promptly on cancellation")
            .unwrap();
    }
}
