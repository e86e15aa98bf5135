//! Recipient ledger: `recipients.jsonl`, one record per agent.
//!
//! All mutations follow the same lock-read-modify-rewrite pattern as the
//! mailbox log, serialized through one exclusive lock on the ledger
//! descriptor — so ledger operations are strictly ordered process-wide.
//! `read_all` takes no lock: readers observe whichever committed line set
//! is on disk.

use crate::error::AtmError;
use crate::io::FileLock;
use crate::policy;
use crate::store::StoreLayout;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

/// An agent's self-declared availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ready,
    Work,
    Offline,
}

impl std::str::FromStr for Status {
    type Err = AtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Status::Ready),
            "work" => Ok(Status::Work),
            "offline" => Ok(Status::Offline),
            other => Err(AtmError::InvalidStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// One agent's ledger record. At most one exists per `recipient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientState {
    pub recipient: String,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<i64>,
}

impl RecipientState {
    fn fresh(recipient: &str, status: Status, now: DateTime<Utc>) -> Self {
        Self {
            recipient: recipient.to_string(),
            status,
            updated_at: now,
            notified_at: None,
            last_read_at: None,
        }
    }

    /// Whether a notification is due right now.
    ///
    /// `work`/`offline` recipients are gated by [`policy::work_protection`]
    /// since their last status change; `ready` recipients are gated by
    /// [`policy::ready_debounce`] since their last notification (or
    /// eligible immediately if never notified).
    pub fn should_notify(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            Status::Work | Status::Offline => {
                now - self.updated_at >= policy::work_protection()
            }
            Status::Ready => match self.notified_at {
                None => true,
                Some(notified_at) => now - notified_at >= policy::ready_debounce(),
            },
        }
    }
}

/// Read every ledger record. No lock is taken; empty if the file is
/// missing.
pub fn read_all(layout: &StoreLayout) -> Result<Vec<RecipientState>, AtmError> {
    let path = layout.ledger_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    parse_lines(&path, &contents)
}

/// Replace the entire ledger with `states`.
pub fn write_all(layout: &StoreLayout, states: &[RecipientState]) -> Result<(), AtmError> {
    crate::store::ensure_store(layout)?;
    let path = layout.ledger_path();
    let file = open_rw_create(&path)?;
    let mut lock = FileLock::exclusive(file).map_err(|e| io_err(&path, e))?;
    rewrite_locked(&mut lock, &path, states)
}

/// Set `recipient`'s status, creating a fresh record if absent.
///
/// When `reset_notified` is `true` (the caller transitioning to `work` or
/// `offline`), `notified_at` is cleared so that on returning to `ready`
/// the agent is immediately re-eligible for notification.
pub fn update_status(
    layout: &StoreLayout,
    recipient: &str,
    status: Status,
    reset_notified: bool,
    now: DateTime<Utc>,
) -> Result<(), AtmError> {
    mutate(layout, |states| {
        match states.iter_mut().find(|s| s.recipient == recipient) {
            Some(state) => {
                state.status = status;
                state.updated_at = now;
                if reset_notified {
                    state.notified_at = None;
                }
            }
            None => states.push(RecipientState::fresh(recipient, status, now)),
        }
    })
}

/// Record that `recipient` was just notified. A no-op (not an error) if
/// the recipient has no ledger record.
pub fn set_notified_at(
    layout: &StoreLayout,
    recipient: &str,
    t: DateTime<Utc>,
) -> Result<(), AtmError> {
    mutate(layout, |states| {
        if let Some(state) = states.iter_mut().find(|s| s.recipient == recipient) {
            state.notified_at = Some(t);
        }
    })
}

/// Record `recipient`'s last in-multiplexer `receive` timestamp
/// (milliseconds since epoch), creating a fresh `ready` record if absent.
pub fn update_last_read_at(
    layout: &StoreLayout,
    recipient: &str,
    ms: i64,
    now: DateTime<Utc>,
) -> Result<(), AtmError> {
    mutate(layout, |states| {
        match states.iter_mut().find(|s| s.recipient == recipient) {
            Some(state) => state.last_read_at = Some(ms),
            None => {
                let mut fresh = RecipientState::fresh(recipient, Status::Ready, now);
                fresh.last_read_at = Some(ms);
                states.push(fresh);
            }
        }
    })
}

/// Remove records whose `updated_at` is older than `now - threshold`.
/// Only rewrites the file if at least one record is removed.
pub fn clean_stale(
    layout: &StoreLayout,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Result<usize, AtmError> {
    let mut removed = 0usize;
    mutate_if_changed(layout, |states| {
        let before = states.len();
        states.retain(|s| now - s.updated_at < threshold);
        removed = before - states.len();
        removed > 0
    })?;
    Ok(removed)
}

/// Remove records whose `recipient` is not in `valid_windows`. Only
/// rewrites the file if something is removed.
pub fn clean_offline_recipients(
    layout: &StoreLayout,
    valid_windows: &HashSet<String>,
) -> Result<usize, AtmError> {
    let mut removed = 0usize;
    mutate_if_changed(layout, |states| {
        let before = states.len();
        states.retain(|s| valid_windows.contains(&s.recipient));
        removed = before - states.len();
        removed > 0
    })?;
    Ok(removed)
}

/// Lock, read, apply `f`, unconditionally rewrite, unlock.
fn mutate<F>(layout: &StoreLayout, f: F) -> Result<(), AtmError>
where
    F: FnOnce(&mut Vec<RecipientState>),
{
    mutate_if_changed(layout, |states| {
        f(states);
        true
    })
}

/// Lock, read, apply `f` (returns whether a rewrite is needed), rewrite
/// only if so, unlock.
fn mutate_if_changed<F>(layout: &StoreLayout, f: F) -> Result<(), AtmError>
where
    F: FnOnce(&mut Vec<RecipientState>) -> bool,
{
    crate::store::ensure_store(layout)?;
    let path = layout.ledger_path();
    let file = open_rw_create(&path)?;
    let mut lock = FileLock::exclusive(file).map_err(|e| io_err(&path, e))?;

    let mut contents = String::new();
    lock.file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|e| io_err(&path, e))?;
    lock.file_mut()
        .read_to_string(&mut contents)
        .map_err(|e| io_err(&path, e))?;

    let mut states = parse_lines(&path, &contents)?;
    if f(&mut states) {
        rewrite_locked(&mut lock, &path, &states)?;
    }
    Ok(())
}

fn rewrite_locked(
    lock: &mut FileLock,
    path: &std::path::Path,
    states: &[RecipientState],
) -> Result<(), AtmError> {
    let mut body = String::new();
    for state in states {
        let line = serde_json::to_string(state).map_err(|e| AtmError::Serialization {
            path: path.to_path_buf(),
            source: e,
        })?;
        body.push_str(&line);
        body.push('\n');
    }
    lock.file_mut().set_len(0).map_err(|e| io_err(path, e))?;
    lock.file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|e| io_err(path, e))?;
    lock.file_mut()
        .write_all(body.as_bytes())
        .map_err(|e| io_err(path, e))?;
    Ok(())
}

fn parse_lines(path: &std::path::Path, contents: &str) -> Result<Vec<RecipientState>, AtmError> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| AtmError::Serialization {
                path: path.to_path_buf(),
                source: e,
            })
        })
        .collect()
}

fn open_rw_create(path: &std::path::Path) -> Result<std::fs::File, AtmError> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path).map_err(|e| io_err(path, e))
}

fn io_err(path: &std::path::Path, source: std::io::Error) -> AtmError {
    AtmError::Io {
        path: path.to_path_buf(),
        source,
    }
}
