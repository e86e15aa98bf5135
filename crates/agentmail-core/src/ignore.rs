//! Ignore list: `.agentmailignore`, one recipient name per line.
//!
//! Read fresh on every check rather than cached, so edits to the file
//! take effect without restarting anything that holds an `IgnoreList`.

use crate::error::AtmError;
use std::collections::HashSet;
use std::path::Path;

/// The set of recipient names senders should not be able to reach.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    names: HashSet<String>,
}

impl IgnoreList {
    /// Load from `path`. A missing file is an empty list, not an error.
    /// Blank lines and lines starting with `#` are skipped.
    pub fn load(path: &Path) -> Result<Self, AtmError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| AtmError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let names = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(Self { names })
    }

    /// Whether `recipient` is on the list.
    pub fn contains(&self, recipient: &str) -> bool {
        self.names.contains(recipient)
    }
}
