//! Environment-variable resolution shared by every AgentMail binary.
//!
//! Centralizes the precedence rules so `agentmail`, `agentmail-mailman`,
//! and `agentmail-mcp` agree on where the store lives and whether they
//! are running inside the multiplexer.

use std::path::PathBuf;

/// Resolve the store root for a repository whose working directory is
/// `cwd`. `ATM_STORE_ROOT`, if set and non-empty, wins; otherwise
/// `<cwd>/.agentmail`.
pub fn store_root(cwd: &std::path::Path) -> PathBuf {
    crate::store::StoreLayout::discover(cwd).root().to_path_buf()
}

/// Whether the process appears to be running inside a terminal
/// multiplexer session (a non-empty `TMUX`).
pub fn inside_multiplexer() -> bool {
    std::env::var_os("TMUX").is_some_and(|v| !v.is_empty())
}
