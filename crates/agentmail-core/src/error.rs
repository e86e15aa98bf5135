//! Error taxonomy shared by every AgentMail crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the mail store, the notifier policy, and the
/// multiplexer adapter.
///
/// Every internal error propagates to the call boundary unchanged; nothing
/// inside the store or the notifier loop retries an operation on its own.
#[derive(Error, Debug)]
pub enum AtmError {
    /// No current tmux window: `TMUX` is unset or the adapter could not
    /// resolve a window for the calling process.
    #[error("not inside a multiplexer session")]
    NotInsideMultiplexer,

    /// A recipient name would escape `mailboxes/` once joined to the store
    /// root.
    #[error("invalid recipient path: {name}")]
    InvalidPath { name: String },

    /// The recipient is not a live window, is present in the ignore list,
    /// or is the caller itself. These are deliberately aliased to one
    /// error so senders cannot distinguish "ignored" from "gone" from
    /// "that's you".
    #[error("recipient not found: {recipient}")]
    RecipientNotFound { recipient: String },

    /// `Send` was called with an empty message body.
    #[error("message is empty")]
    EmptyMessage,

    /// The message body exceeds 65,536 bytes.
    #[error("message too large: {size} bytes (max 65536)")]
    MessageTooLarge { size: usize },

    /// `SetStatus` was called with a value outside `ready`/`work`/`offline`.
    #[error("invalid status '{value}': expected ready, work, or offline")]
    InvalidStatus { value: String },

    /// A filesystem or file-lock error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mailbox or ledger line failed to parse as JSON.
    #[error("failed to parse {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A second `mailman` instance tried to start against a store already
    /// locked by a running daemon.
    #[error("another mailman daemon is already running for this store")]
    AlreadyRunning,
}

impl AtmError {
    /// Map the error to the process exit code the CLI reports for it.
    /// `NotInsideMultiplexer` is the only condition that exits 2; everything
    /// else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AtmError::NotInsideMultiplexer => 2,
            _ => 1,
        }
    }
}
