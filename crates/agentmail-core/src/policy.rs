//! Notifier policy constants.

use chrono::Duration;

/// Minimum gap between two notifications to a `ready` recipient.
pub fn ready_debounce() -> Duration {
    Duration::seconds(60)
}

/// Minimum gap, while `work`/`offline`, before the recipient is notified
/// despite not having returned to `ready`.
pub fn work_protection() -> Duration {
    Duration::hours(1)
}

/// Minimum gap between notifications to a stateless (no ledger record)
/// mailbox owner.
pub fn stateless_interval() -> Duration {
    Duration::seconds(60)
}
