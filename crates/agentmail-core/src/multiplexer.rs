//! Multiplexer adapter (ambient): window discovery and notification
//! delivery, abstracted behind a trait so `MailOps` can be tested without
//! a real tmux server.

use crate::error::AtmError;
use std::process::Command;

/// What `MailOps` needs from a terminal multiplexer.
pub trait Multiplexer {
    /// The caller's own window name, or `None` if not running inside the
    /// multiplexer (`TMUX` unset, or the adapter can't resolve a window).
    fn current_window(&self) -> Result<Option<String>, AtmError>;

    /// Every live window name, for recipient existence checks.
    fn list_windows(&self) -> Result<Vec<String>, AtmError>;

    /// Deliver a one-line notification to `window`. Fire-once: on
    /// failure the caller decides whether to retry, the adapter does not.
    fn notify_window(&self, window: &str, text: &str) -> Result<(), AtmError>;
}

/// `Multiplexer` backed by the `tmux` CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct TmuxMultiplexer;

impl TmuxMultiplexer {
    fn run(args: &[&str]) -> Result<std::process::Output, AtmError> {
        Command::new("tmux")
            .args(args)
            .output()
            .map_err(|e| AtmError::Io {
                path: std::path::PathBuf::from("tmux"),
                source: e,
            })
    }
}

impl Multiplexer for TmuxMultiplexer {
    fn current_window(&self) -> Result<Option<String>, AtmError> {
        if std::env::var_os("TMUX").is_none() {
            return Ok(None);
        }
        let output = Self::run(&["display-message", "-p", "#{window_name}"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() {
            Ok(None)
        } else {
            Ok(Some(name))
        }
    }

    fn list_windows(&self) -> Result<Vec<String>, AtmError> {
        let output = Self::run(&["list-windows", "-F", "#{window_name}"])?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    fn notify_window(&self, window: &str, text: &str) -> Result<(), AtmError> {
        let output = Self::run(&["send-keys", "-t", window, "-l", text])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(AtmError::Io {
                path: std::path::PathBuf::from(format!("tmux window {window}")),
                source: std::io::Error::other(stderr),
            });
        }
        let enter = Self::run(&["send-keys", "-t", window, "Enter"])?;
        if !enter.status.success() {
            let stderr = String::from_utf8_lossy(&enter.stderr).to_string();
            return Err(AtmError::Io {
                path: std::path::PathBuf::from(format!("tmux window {window}")),
                source: std::io::Error::other(stderr),
            });
        }
        Ok(())
    }
}

/// In-memory stand-in for a tmux server, shared by `ops.rs` and the
/// notifier loop's tests.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeMultiplexer {
        pub current: Option<String>,
        pub windows: Vec<String>,
        pub sent: RefCell<HashMap<String, Vec<String>>>,
        pub fail_window: Option<String>,
    }

    impl Multiplexer for FakeMultiplexer {
        fn current_window(&self) -> Result<Option<String>, AtmError> {
            Ok(self.current.clone())
        }

        fn list_windows(&self) -> Result<Vec<String>, AtmError> {
            Ok(self.windows.clone())
        }

        fn notify_window(&self, window: &str, text: &str) -> Result<(), AtmError> {
            if self.fail_window.as_deref() == Some(window) {
                return Err(AtmError::Io {
                    path: std::path::PathBuf::from(window),
                    source: std::io::Error::other("simulated delivery failure"),
                });
            }
            self.sent
                .borrow_mut()
                .entry(window.to_string())
                .or_default()
                .push(text.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeMultiplexer;
    use super::*;

    #[test]
    fn fake_multiplexer_records_deliveries() {
        let mux = FakeMultiplexer {
            windows: vec!["alice".to_string()],
            ..Default::default()
        };
        mux.notify_window("alice", "you have mail").unwrap();
        assert_eq!(mux.sent.borrow().get("alice").unwrap().len(), 1);
    }

    #[test]
    fn fake_multiplexer_can_simulate_failure() {
        let mux = FakeMultiplexer {
            fail_window: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(mux.notify_window("alice", "hi").is_err());
    }
}
