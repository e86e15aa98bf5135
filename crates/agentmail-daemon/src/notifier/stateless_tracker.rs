//! In-process tracker for mailbox-owning windows that have never declared
//! a status.
//!
//! A plain map guarded by a mutex, mutated only by the notifier loop's
//! own task. Safe to reset on restart — the worst effect of losing it is
//! one extra notification.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct StatelessTracker {
    last_notified: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl StatelessTracker {
    pub fn new() -> Self {
        Self {
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `window` is due for a stateless notification at `now`.
    pub fn should_notify(&self, window: &str, now: DateTime<Utc>, interval: chrono::Duration) -> bool {
        let map = self.last_notified.lock().expect("stateless tracker poisoned");
        match map.get(window) {
            None => true,
            Some(last) => now - *last >= interval,
        }
    }

    /// Record that `window` was just notified.
    pub fn record(&self, window: &str, now: DateTime<Utc>) {
        self.last_notified
            .lock()
            .expect("stateless tracker poisoned")
            .insert(window.to_string(), now);
    }

    /// Drop tracker entries for windows that no longer have a mailbox
    /// file, so the map does not grow unboundedly.
    pub fn prune(&self, live_mailbox_owners: &std::collections::HashSet<String>) {
        self.last_notified
            .lock()
            .expect("stateless tracker poisoned")
            .retain(|window, _| live_mailbox_owners.contains(window));
    }
}

impl Default for StatelessTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn absent_window_is_immediately_eligible() {
        let tracker = StatelessTracker::new();
        assert!(tracker.should_notify("bob", Utc::now(), Duration::seconds(60)));
    }

    #[test]
    fn recorded_window_respects_interval() {
        let tracker = StatelessTracker::new();
        let t0 = Utc::now();
        tracker.record("bob", t0);

        assert!(!tracker.should_notify("bob", t0 + Duration::seconds(30), Duration::seconds(60)));
        assert!(tracker.should_notify("bob", t0 + Duration::seconds(60), Duration::seconds(60)));
    }

    #[test]
    fn prune_drops_vanished_windows_only() {
        let tracker = StatelessTracker::new();
        let now = Utc::now();
        tracker.record("bob", now);
        tracker.record("carol", now);

        let live: std::collections::HashSet<String> = ["bob".to_string()].into_iter().collect();
        tracker.prune(&live);

        // carol's entry was dropped, so she is immediately eligible again.
        assert!(tracker.should_notify("carol", now, Duration::seconds(60)));
        // bob's entry survived pruning, so the interval still applies.
        assert!(!tracker.should_notify("bob", now + Duration::seconds(1), Duration::seconds(60)));
    }
}
