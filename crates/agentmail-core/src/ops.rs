//! Mail operations: the composition of identifiers, the store layout,
//! mailboxes, the recipient ledger, and the ignore list over a
//! [`Multiplexer`] that the CLI and MCP front ends dispatch into.

use crate::error::AtmError;
use crate::ignore::IgnoreList;
use crate::ledger::{self, Status};
use crate::mailbox;
use crate::message::{MAX_MESSAGE_BYTES, Message};
use crate::multiplexer::Multiplexer;
use crate::store::StoreLayout;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

/// The three fields a successful `Receive` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub from: String,
    pub id: String,
    pub message: String,
}

/// One entry in `ListRecipients()`'s result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientInfo {
    pub name: String,
    pub is_current: bool,
}

/// Counts of what a cleanup sweep removed (or would remove, under
/// `dry_run`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed_ledger_stale: usize,
    pub removed_ledger_offline: usize,
    pub removed_messages: usize,
    pub removed_empty_mailboxes: usize,
}

/// The C7 composition: store access plus a multiplexer adapter.
pub struct MailOps<M: Multiplexer> {
    layout: StoreLayout,
    multiplexer: M,
}

impl<M: Multiplexer> MailOps<M> {
    pub fn new(layout: StoreLayout, multiplexer: M) -> Self {
        Self { layout, multiplexer }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// The caller's own window name. Every operation below resolves
    /// identity this way; there is no separate out-of-band agent name.
    fn resolve_self(&self) -> Result<String, AtmError> {
        self.multiplexer
            .current_window()?
            .ok_or(AtmError::NotInsideMultiplexer)
    }

    fn ignore_list(&self) -> Result<IgnoreList, AtmError> {
        IgnoreList::load(&self.layout.ignore_file_path())
    }

    /// Deliver `message` to `recipient`, returning the assigned id.
    pub fn send(&self, recipient: &str, message: &str) -> Result<String, AtmError> {
        if message.is_empty() {
            return Err(AtmError::EmptyMessage);
        }
        if message.len() > MAX_MESSAGE_BYTES {
            return Err(AtmError::MessageTooLarge {
                size: message.len(),
            });
        }

        let from = self.resolve_self()?;
        if recipient == from {
            return Err(AtmError::RecipientNotFound {
                recipient: recipient.to_string(),
            });
        }

        let windows = self.multiplexer.list_windows()?;
        let ignored = self.ignore_list()?;
        if !windows.iter().any(|w| w == recipient) || ignored.contains(recipient) {
            return Err(AtmError::RecipientNotFound {
                recipient: recipient.to_string(),
            });
        }

        let id = crate::id::new_id();
        let msg = Message {
            id: id.clone(),
            from,
            to: recipient.to_string(),
            message: message.to_string(),
            read_flag: false,
        };
        mailbox::append(&self.layout, recipient, &msg)?;
        Ok(id)
    }

    /// Claim the caller's oldest unread message, if any.
    pub fn receive(&self, now: DateTime<Utc>) -> Result<Option<ReceivedMessage>, AtmError> {
        let me = self.resolve_self()?;
        let claimed = mailbox::claim_first_unread(&self.layout, &me)?;
        if claimed.is_some() {
            ledger::update_last_read_at(&self.layout, &me, now.timestamp_millis(), now)?;
        }
        Ok(claimed.map(|m| ReceivedMessage {
            from: m.from,
            id: m.id,
            message: m.message,
        }))
    }

    /// Declare the caller's availability.
    pub fn set_status(&self, status: &str, now: DateTime<Utc>) -> Result<(), AtmError> {
        let status = Status::from_str(status)?;
        let me = self.resolve_self()?;
        let reset_notified = matches!(status, Status::Work | Status::Offline);
        ledger::update_status(&self.layout, &me, status, reset_notified, now)
    }

    /// Every window the caller may address, with the caller's own window
    /// flagged and never filtered.
    pub fn list_recipients(&self) -> Result<Vec<RecipientInfo>, AtmError> {
        let me = self.resolve_self()?;
        let ignored = self.ignore_list()?;
        let windows = self.multiplexer.list_windows()?;

        Ok(windows
            .into_iter()
            .filter(|w| *w == me || !ignored.contains(w))
            .map(|w| RecipientInfo {
                is_current: w == me,
                name: w,
            })
            .collect())
    }

    /// Remove stale or orphaned ledger records, delivered messages, and
    /// empty mailbox files. `Message` carries no timestamp of its own
    /// (spec §3 excludes explicit timestamps from agents' view), so
    /// "delivered" messages are purged wholesale rather than by age; the
    /// ledger-side thresholds still apply per-record.
    pub fn cleanup_sweep(
        &self,
        now: DateTime<Utc>,
        stale_ledger_threshold: Duration,
        dry_run: bool,
    ) -> Result<CleanupReport, AtmError> {
        let valid_windows: HashSet<String> = self.multiplexer.list_windows()?.into_iter().collect();
        let mut report = CleanupReport::default();

        if dry_run {
            let states = ledger::read_all(&self.layout)?;
            report.removed_ledger_stale = states
                .iter()
                .filter(|s| now - s.updated_at >= stale_ledger_threshold)
                .count();
            report.removed_ledger_offline = states
                .iter()
                .filter(|s| !valid_windows.contains(&s.recipient))
                .count();
        } else {
            report.removed_ledger_stale =
                ledger::clean_stale(&self.layout, stale_ledger_threshold, now)?;
            report.removed_ledger_offline =
                ledger::clean_offline_recipients(&self.layout, &valid_windows)?;
        }

        let (removed_messages, removed_empty_mailboxes) = self.sweep_mailboxes(dry_run)?;
        report.removed_messages = removed_messages;
        report.removed_empty_mailboxes = removed_empty_mailboxes;
        Ok(report)
    }

    fn sweep_mailboxes(&self, dry_run: bool) -> Result<(usize, usize), AtmError> {
        let dir = self.layout.mailboxes_dir();
        if !dir.exists() {
            return Ok((0, 0));
        }

        let mut removed_messages = 0usize;
        let mut removed_empty = 0usize;

        for entry in std::fs::read_dir(&dir).map_err(|e| AtmError::Io {
            path: dir.clone(),
            source: e,
        })? {
            let entry = entry.map_err(|e| AtmError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            let Some(recipient) = recipient_name(&path) else {
                continue;
            };

            let messages = mailbox::read_all(&self.layout, &recipient)?;
            let kept: Vec<_> = messages.iter().filter(|m| !m.read_flag).cloned().collect();
            removed_messages += messages.len() - kept.len();

            if dry_run {
                if kept.is_empty() {
                    removed_empty += 1;
                }
                continue;
            }

            if kept.is_empty() {
                std::fs::remove_file(&path).map_err(|e| AtmError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                removed_empty += 1;
            } else if kept.len() != messages.len() {
                mailbox::write_all(&self.layout, &recipient, &kept)?;
            }
        }

        Ok((removed_messages, removed_empty))
    }
}

fn recipient_name(path: &std::path::Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

/// Read-only accessor used by the notifier loop, which needs ledger and
/// mailbox access without a multiplexer identity of its own.
pub fn mailbox_recipients(layout: &StoreLayout) -> Result<Vec<String>, AtmError> {
    let dir = layout.mailboxes_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(|e| AtmError::Io {
        path: dir.clone(),
        source: e,
    })? {
        let entry = entry.map_err(|e| AtmError::Io {
            path: dir.clone(),
            source: e,
        })?;
        if let Some(name) = recipient_name(&entry.path()) {
            names.push(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::test_support::FakeMultiplexer;
    use tempfile::TempDir;

    fn ops(dir: &TempDir, current: &str, windows: &[&str]) -> MailOps<FakeMultiplexer> {
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let mux = FakeMultiplexer {
            current: Some(current.to_string()),
            windows: windows.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        MailOps::new(layout, mux)
    }

    #[test]
    fn send_rejects_empty_message() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);
        assert!(matches!(
            mailops.send("bob", ""),
            Err(AtmError::EmptyMessage)
        ));
    }

    #[test]
    fn send_rejects_oversized_message() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);
        let big = "a".repeat(MAX_MESSAGE_BYTES + 1);
        assert!(matches!(
            mailops.send("bob", &big),
            Err(AtmError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn send_accepts_exactly_max_size_message() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);
        let exact = "a".repeat(MAX_MESSAGE_BYTES);
        assert!(mailops.send("bob", &exact).is_ok());
    }

    #[test]
    fn send_rejects_self() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);
        assert!(matches!(
            mailops.send("alice", "hi"),
            Err(AtmError::RecipientNotFound { .. })
        ));
    }

    #[test]
    fn send_rejects_unknown_window() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);
        assert!(matches!(
            mailops.send("carol", "hi"),
            Err(AtmError::RecipientNotFound { .. })
        ));
    }

    #[test]
    fn send_rejects_ignored_recipient() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".agentmailignore"), "bob\n").unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);
        assert!(matches!(
            mailops.send("bob", "hi"),
            Err(AtmError::RecipientNotFound { .. })
        ));
    }

    #[test]
    fn send_without_current_window_is_not_inside_multiplexer() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let mux = FakeMultiplexer {
            windows: vec!["bob".to_string()],
            ..Default::default()
        };
        let mailops = MailOps::new(layout, mux);
        assert!(matches!(
            mailops.send("bob", "hi"),
            Err(AtmError::NotInsideMultiplexer)
        ));
    }

    #[test]
    fn send_then_receive_round_trips() {
        let dir = TempDir::new().unwrap();
        let sender = ops(&dir, "alice", &["alice", "bob"]);
        let id = sender.send("bob", "Hello from alice").unwrap();

        let receiver = ops(&dir, "bob", &["alice", "bob"]);
        let received = receiver.receive(Utc::now()).unwrap().unwrap();
        assert_eq!(received.from, "alice");
        assert_eq!(received.id, id);
        assert_eq!(received.message, "Hello from alice");

        assert!(receiver.receive(Utc::now()).unwrap().is_none());
    }

    #[test]
    fn receive_updates_last_read_at() {
        let dir = TempDir::new().unwrap();
        let sender = ops(&dir, "alice", &["alice", "bob"]);
        sender.send("bob", "hi").unwrap();

        let receiver = ops(&dir, "bob", &["alice", "bob"]);
        let now = Utc::now();
        receiver.receive(now).unwrap();

        let states = ledger::read_all(receiver.layout()).unwrap();
        let bob = states.iter().find(|s| s.recipient == "bob").unwrap();
        assert_eq!(bob.last_read_at, Some(now.timestamp_millis()));
    }

    #[test]
    fn set_status_rejects_unknown_value() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice"]);
        assert!(matches!(
            mailops.set_status("busy", Utc::now()),
            Err(AtmError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn set_status_work_resets_notified_at() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice"]);
        let now = Utc::now();
        mailops.set_status("ready", now).unwrap();
        ledger::set_notified_at(mailops.layout(), "alice", now).unwrap();

        mailops.set_status("work", now).unwrap();
        let states = ledger::read_all(mailops.layout()).unwrap();
        assert!(states[0].notified_at.is_none());
    }

    #[test]
    fn list_recipients_marks_current_and_respects_ignore() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".agentmailignore"), "carol\n").unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob", "carol"]);

        let recipients = mailops.list_recipients().unwrap();
        let names: Vec<_> = recipients.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(recipients.iter().find(|r| r.name == "alice").unwrap().is_current);
    }

    #[test]
    fn list_recipients_never_filters_self_even_if_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".agentmailignore"), "alice\n").unwrap();
        let mailops = ops(&dir, "alice", &["alice", "bob"]);

        let recipients = mailops.list_recipients().unwrap();
        assert!(recipients.iter().any(|r| r.name == "alice"));
    }

    #[test]
    fn cleanup_sweep_removes_read_messages_and_empty_mailboxes() {
        let dir = TempDir::new().unwrap();
        let sender = ops(&dir, "alice", &["alice", "bob"]);
        sender.send("bob", "one").unwrap();

        let receiver = ops(&dir, "bob", &["alice", "bob"]);
        receiver.receive(Utc::now()).unwrap();

        let report = receiver
            .cleanup_sweep(Utc::now(), Duration::hours(48), false)
            .unwrap();
        assert_eq!(report.removed_messages, 1);
        assert_eq!(report.removed_empty_mailboxes, 1);
        assert!(!receiver.layout().mailbox_path("bob").unwrap().exists());
    }

    #[test]
    fn cleanup_sweep_dry_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let sender = ops(&dir, "alice", &["alice", "bob"]);
        sender.send("bob", "one").unwrap();
        let receiver = ops(&dir, "bob", &["alice", "bob"]);
        receiver.receive(Utc::now()).unwrap();

        let report = receiver
            .cleanup_sweep(Utc::now(), Duration::hours(48), true)
            .unwrap();
        assert_eq!(report.removed_messages, 1);
        assert!(receiver.layout().mailbox_path("bob").unwrap().exists());
    }

    #[test]
    fn cleanup_sweep_removes_offline_ledger_records() {
        let dir = TempDir::new().unwrap();
        let mailops = ops(&dir, "alice", &["alice"]);
        ledger::update_status(mailops.layout(), "ghost", Status::Ready, false, Utc::now()).unwrap();

        let report = mailops
            .cleanup_sweep(Utc::now(), Duration::hours(48), false)
            .unwrap();
        assert_eq!(report.removed_ledger_offline, 1);
    }
}
