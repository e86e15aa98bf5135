//! The notification tick: one stated-then-stateless scan of the
//! store, shared by Watching and Polling mode.

use crate::notifier::stateless_tracker::StatelessTracker;
use agentmail_core::ledger;
use agentmail_core::multiplexer::Multiplexer;
use agentmail_core::{mailbox, ops, policy, store::StoreLayout};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

/// What one tick accomplished, for logging/tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub stated_notified: Vec<String>,
    pub stateless_notified: Vec<String>,
}

/// Run one notification tick against `layout`, delivering through `mux`.
///
/// A degraded ledger read is treated as an empty stated set (every mailbox
/// owner falls through to the stateless phase for this tick) rather than
/// aborting the tick.
pub fn run_tick<M: Multiplexer>(
    layout: &StoreLayout,
    mux: &M,
    tracker: &StatelessTracker,
    now: DateTime<Utc>,
) -> TickReport {
    let mut report = TickReport::default();

    let states = match ledger::read_all(layout) {
        Ok(states) => states,
        Err(e) => {
            warn!("ledger read failed during notifier tick, degrading to stateless: {e}");
            Vec::new()
        }
    };
    let stated: HashSet<String> = states.iter().map(|s| s.recipient.clone()).collect();

    for state in &states {
        if !state.should_notify(now) {
            continue;
        }
        let unread = match mailbox::find_unread(layout, &state.recipient) {
            Ok(unread) => unread,
            Err(e) => {
                warn!("failed reading mailbox for {}: {e}", state.recipient);
                continue;
            }
        };
        if unread.is_empty() {
            continue;
        }
        match mux.notify_window(&state.recipient, "Check your agentmail") {
            Ok(()) => {
                if let Err(e) = ledger::set_notified_at(layout, &state.recipient, now) {
                    warn!("failed recording notified_at for {}: {e}", state.recipient);
                }
                report.stated_notified.push(state.recipient.clone());
            }
            Err(e) => {
                debug!("delivery failed for {}, will retry next tick: {e}", state.recipient);
            }
        }
    }

    let mailbox_recipients = match ops::mailbox_recipients(layout) {
        Ok(names) => names,
        Err(e) => {
            warn!("failed listing mailboxes during notifier tick: {e}");
            Vec::new()
        }
    };
    let live_mailbox_owners: HashSet<String> = mailbox_recipients.iter().cloned().collect();

    for recipient in &mailbox_recipients {
        if stated.contains(recipient) {
            continue;
        }
        if !tracker.should_notify(recipient, now, policy::stateless_interval()) {
            continue;
        }
        let unread = match mailbox::find_unread(layout, recipient) {
            Ok(unread) => unread,
            Err(e) => {
                warn!("failed reading mailbox for {recipient}: {e}");
                continue;
            }
        };
        if unread.is_empty() {
            continue;
        }
        match mux.notify_window(recipient, "Check your agentmail") {
            Ok(()) => {
                tracker.record(recipient, now);
                report.stateless_notified.push(recipient.clone());
            }
            Err(e) => {
                debug!("stateless delivery failed for {recipient}, will retry next tick: {e}");
            }
        }
    }

    tracker.prune(&live_mailbox_owners);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeMultiplexer;
    use agentmail_core::ledger::Status;
    use chrono::Duration;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> StoreLayout {
        StoreLayout::new(dir.path().join(".agentmail"))
    }

    fn append(layout: &StoreLayout, recipient: &str) {
        mailbox::append(
            layout,
            recipient,
            &agentmail_core::message::Message {
                id: "aaaaaaaa".to_string(),
                from: "alice".to_string(),
                to: recipient.to_string(),
                message: "hi".to_string(),
                read_flag: false,
            },
        )
        .unwrap();
    }

    #[test]
    fn ready_recipient_with_unread_mail_is_notified() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let now = Utc::now();
        ledger::update_status(&layout, "bob", Status::Ready, false, now).unwrap();
        append(&layout, "bob");

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        let report = run_tick(&layout, &mux, &tracker, now);

        assert_eq!(report.stated_notified, vec!["bob".to_string()]);
        let states = ledger::read_all(&layout).unwrap();
        assert!(states[0].notified_at.is_some());
    }

    #[test]
    fn ready_recipient_within_debounce_is_skipped() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let t0 = Utc::now();
        ledger::update_status(&layout, "bob", Status::Ready, false, t0).unwrap();
        ledger::set_notified_at(&layout, "bob", t0).unwrap();
        append(&layout, "bob");

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        let report = run_tick(&layout, &mux, &tracker, t0 + Duration::seconds(30));
        assert!(report.stated_notified.is_empty());
    }

    #[test]
    fn work_recipient_is_gated_by_work_protection() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let t0 = Utc::now();
        ledger::update_status(&layout, "bob", Status::Work, true, t0).unwrap();
        append(&layout, "bob");

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();

        let early = run_tick(&layout, &mux, &tracker, t0 + Duration::minutes(30));
        assert!(early.stated_notified.is_empty());

        let late = run_tick(&layout, &mux, &tracker, t0 + Duration::hours(1));
        assert_eq!(late.stated_notified, vec!["bob".to_string()]);
    }

    #[test]
    fn delivery_failure_does_not_advance_notified_at() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let now = Utc::now();
        ledger::update_status(&layout, "bob", Status::Ready, false, now).unwrap();
        append(&layout, "bob");

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            fail_window: Some("bob".to_string()),
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        let report = run_tick(&layout, &mux, &tracker, now);
        assert!(report.stated_notified.is_empty());

        let states = ledger::read_all(&layout).unwrap();
        assert!(states[0].notified_at.is_none());
    }

    #[test]
    fn stateless_mailbox_owner_is_notified_without_a_ledger_record() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let now = Utc::now();
        append(&layout, "bob");

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        let report = run_tick(&layout, &mux, &tracker, now);
        assert_eq!(report.stateless_notified, vec!["bob".to_string()]);

        let again = run_tick(&layout, &mux, &tracker, now + Duration::seconds(10));
        assert!(again.stateless_notified.is_empty());

        let later = run_tick(&layout, &mux, &tracker, now + Duration::seconds(61));
        assert_eq!(later.stateless_notified, vec!["bob".to_string()]);
    }

    #[test]
    fn stated_recipient_is_never_double_counted_as_stateless() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let now = Utc::now();
        ledger::update_status(&layout, "bob", Status::Ready, false, now).unwrap();
        append(&layout, "bob");

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        let report = run_tick(&layout, &mux, &tracker, now);
        assert_eq!(report.stated_notified.len(), 1);
        assert!(report.stateless_notified.is_empty());
    }

    #[test]
    fn recipient_with_no_unread_mail_is_not_notified() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let now = Utc::now();
        ledger::update_status(&layout, "bob", Status::Ready, false, now).unwrap();

        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let tracker = StatelessTracker::new();
        let report = run_tick(&layout, &mux, &tracker, now);
        assert!(report.stated_notified.is_empty());
        assert!(report.stateless_notified.is_empty());
    }
}
