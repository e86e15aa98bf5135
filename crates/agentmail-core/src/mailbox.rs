//! Mailbox log: the per-recipient append-only JSON-lines file.
//!
//! Concurrency is entirely lock-based: `append`/`mark_as_read`/`write_all`
//! take an exclusive lock on the mailbox descriptor and hold it for the
//! whole read-modify-write; `read_all` takes a shared lock. Per-recipient
//! isolation is free — mailboxes are separate files, so `append` to
//! `alice.jsonl` never contends with `append` to `bob.jsonl`.

use crate::error::AtmError;
use crate::io::FileLock;
use crate::message::Message;
use crate::store::{StoreLayout, ensure_store};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

/// Append `msg` to `recipient`'s mailbox.
///
/// Ensures the store tree exists, opens (or creates, mode `0600`) the
/// mailbox for append, takes an exclusive lock, writes one JSON line
/// terminated by `\n`, then releases the lock. No retry: the caller
/// reports any failure.
pub fn append(layout: &StoreLayout, recipient: &str, msg: &Message) -> Result<(), AtmError> {
    ensure_store(layout)?;
    let path = layout.mailbox_path(recipient)?;

    let file = open_rw_create(&path)?;
    let mut lock = FileLock::exclusive(file).map_err(|e| io_err(&path, e))?;

    let mut line = serde_json::to_string(msg).map_err(|e| AtmError::Serialization {
        path: path.clone(),
        source: e,
    })?;
    line.push('\n');

    // Append mode writes happen at EOF regardless of the cursor, but we
    // hold the lock already so a plain write suffices.
    lock.file_mut()
        .seek(SeekFrom::End(0))
        .map_err(|e| io_err(&path, e))?;
    lock.file_mut()
        .write_all(line.as_bytes())
        .map_err(|e| io_err(&path, e))?;

    Ok(())
}

/// Read every message in `recipient`'s mailbox, in append order.
///
/// Returns an empty vector if the mailbox file does not exist. Empty
/// lines are skipped; a malformed line aborts with
/// [`AtmError::Serialization`].
pub fn read_all(layout: &StoreLayout, recipient: &str) -> Result<Vec<Message>, AtmError> {
    let path = layout.mailbox_path(recipient)?;
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = OpenOptions::new()
        .read(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    let lock = FileLock::shared(file).map_err(|e| io_err(&path, e))?;

    let mut contents = String::new();
    lock.file()
        .try_clone()
        .map_err(|e| io_err(&path, e))?
        .read_to_string(&mut contents)
        .map_err(|e| io_err(&path, e))?;

    parse_lines(&path, &contents)
}

/// `read_all` filtered to unread messages, preserving FIFO order.
pub fn find_unread(layout: &StoreLayout, recipient: &str) -> Result<Vec<Message>, AtmError> {
    Ok(read_all(layout, recipient)?
        .into_iter()
        .filter(|m| !m.read_flag)
        .collect())
}

/// Atomically find the oldest unread message and mark it read, returning
/// it. Used by the `Receive` operation so that concurrent receivers on
/// the same mailbox never observe or claim the same message: the whole
/// find-oldest-unread-and-mark step happens under one exclusive-lock
/// acquisition, unlike `find_unread` (shared lock) followed by a separate
/// `mark_as_read` call, which would leave a window for two callers to
/// both pick the same message before either marks it.
pub fn claim_first_unread(
    layout: &StoreLayout,
    recipient: &str,
) -> Result<Option<Message>, AtmError> {
    let path = layout.mailbox_path(recipient)?;
    if !path.exists() {
        return Ok(None);
    }

    let file = open_rw_create(&path)?;
    let mut lock = FileLock::exclusive(file).map_err(|e| io_err(&path, e))?;

    let mut contents = String::new();
    lock.file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|e| io_err(&path, e))?;
    lock.file_mut()
        .read_to_string(&mut contents)
        .map_err(|e| io_err(&path, e))?;

    let mut messages = parse_lines(&path, &contents)?;
    let claimed = match messages.iter_mut().find(|m| !m.read_flag) {
        Some(found) => {
            found.read_flag = true;
            Some(found.clone())
        }
        None => None,
    };

    if claimed.is_some() {
        rewrite_locked(&mut lock, &path, &messages)?;
    }

    Ok(claimed)
}

/// Flip `read_flag` to `true` on the first message in `recipient`'s
/// mailbox whose `id` matches. No-op (but still a clean rewrite) if no
/// message matches.
///
/// The entire read-modify-write happens under one exclusive-lock
/// acquisition, so it is atomic with respect to concurrent `append`s on
/// the same file, which contend for the same lock.
pub fn mark_as_read(layout: &StoreLayout, recipient: &str, id: &str) -> Result<(), AtmError> {
    let path = layout.mailbox_path(recipient)?;
    let file = open_rw_create(&path)?;
    let mut lock = FileLock::exclusive(file).map_err(|e| io_err(&path, e))?;

    let mut contents = String::new();
    lock.file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|e| io_err(&path, e))?;
    lock.file_mut()
        .read_to_string(&mut contents)
        .map_err(|e| io_err(&path, e))?;

    let mut messages = parse_lines(&path, &contents)?;
    if let Some(found) = messages.iter_mut().find(|m| m.id == id) {
        found.read_flag = true;
    }

    rewrite_locked(&mut lock, &path, &messages)
}

/// Replace the entire contents of `recipient`'s mailbox with `messages`.
pub fn write_all(layout: &StoreLayout, recipient: &str, messages: &[Message]) -> Result<(), AtmError> {
    let path = layout.mailbox_path(recipient)?;
    let file = open_rw_create(&path)?;
    let mut lock = FileLock::exclusive(file).map_err(|e| io_err(&path, e))?;
    rewrite_locked(&mut lock, &path, messages)
}

fn rewrite_locked(
    lock: &mut FileLock,
    path: &std::path::Path,
    messages: &[Message],
) -> Result<(), AtmError> {
    let mut body = String::new();
    for msg in messages {
        let line = serde_json::to_string(msg).map_err(|e| AtmError::Serialization {
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

fn parse_lines(path: &std::path::Path, contents: &str) -> Result<Vec<Message>, AtmError> {
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
