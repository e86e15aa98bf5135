//! Store layout: the on-disk directory tree and its canonical paths.

use crate::error::AtmError;
use std::path::{Path, PathBuf};

const STORE_DIR_NAME: &str = ".agentmail";
const MAILBOXES_DIR_NAME: &str = "mailboxes";
const LEDGER_FILE_NAME: &str = "recipients.jsonl";
const PIDFILE_NAME: &str = "mailman.pid";
const IGNORE_FILE_NAME: &str = ".agentmailignore";

/// Canonical paths for one AgentMail store.
///
/// `root` is conventionally `<repo-root>/.agentmail`. `.agentmailignore`
/// lives next to `root` (at `<repo-root>/.agentmailignore`), not inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Build a layout rooted at an explicit `.agentmail` directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the store root for a repository whose working directory is
    /// `cwd`: `ATM_STORE_ROOT` if set and non-empty, otherwise
    /// `<cwd>/.agentmail`. Callers that want ancestor discovery should
    /// walk `cwd`'s parents themselves before calling this — the lookup
    /// itself is a single join.
    pub fn discover(cwd: &Path) -> Self {
        if let Ok(over) = std::env::var("ATM_STORE_ROOT") {
            let trimmed = over.trim();
            if !trimmed.is_empty() {
                return Self::new(PathBuf::from(trimmed));
            }
        }
        Self::new(cwd.join(STORE_DIR_NAME))
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/mailboxes`.
    pub fn mailboxes_dir(&self) -> PathBuf {
        self.root.join(MAILBOXES_DIR_NAME)
    }

    /// `<root>/recipients.jsonl`.
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE_NAME)
    }

    /// `<root>/mailman.pid`.
    pub fn pidfile_path(&self) -> PathBuf {
        self.root.join(PIDFILE_NAME)
    }

    /// `.agentmailignore` next to the store root, i.e. the repository
    /// root (`root`'s parent).
    pub fn ignore_file_path(&self) -> PathBuf {
        self.root
            .parent()
            .map(|p| p.join(IGNORE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(IGNORE_FILE_NAME))
    }

    /// Mailbox path for `recipient`, validated through the path guard.
    pub fn mailbox_path(&self, recipient: &str) -> Result<PathBuf, AtmError> {
        let mailboxes = self.mailboxes_dir();
        // Validate the raw recipient name before appending the extension,
        // so a name like "agent.worker" is checked as one component rather
        // than having its trailing segment swapped out by `with_extension`.
        crate::path_guard::safe_join(&mailboxes, recipient)?;
        Ok(mailboxes.join(format!("{recipient}.jsonl")))
    }
}

/// Create `root/` and `root/mailboxes/` (mode `0750`) if missing.
/// Idempotent.
pub fn ensure_store(layout: &StoreLayout) -> Result<(), AtmError> {
    create_dir_restricted(layout.root())?;
    create_dir_restricted(&layout.mailboxes_dir())?;
    Ok(())
}

fn create_dir_restricted(dir: &Path) -> Result<(), AtmError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| AtmError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    set_restricted_permissions(dir)
}

#[cfg(unix)]
fn set_restricted_permissions(dir: &Path) -> Result<(), AtmError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o750);
    std::fs::set_permissions(dir, perms).map_err(|e| AtmError::Io {
        path: dir.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn set_restricted_permissions(_dir: &Path) -> Result<(), AtmError> {
    Ok(())
}
