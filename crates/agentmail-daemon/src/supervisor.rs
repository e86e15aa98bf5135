//! Daemon supervisor: pidfile-based single-instance enforcement, status
//! queries, and Unix double-fork detachment.
//!
//! Liveness is checked with `kill(pid, 0)`, a probe that delivers no
//! signal and only reports whether the process still exists.

use agentmail_core::error::AtmError;
use agentmail_core::store::StoreLayout;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Held for the daemon's entire lifetime. Dropping it unlocks and
/// best-effort removes the pidfile.
pub struct PidfileGuard {
    path: PathBuf,
    file: File,
}

impl Drop for PidfileGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// What `mailman status` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    Running { pid: u32 },
    StoppedCleanly,
    StoppedStalePidfile { stale_pid: u32 },
}

/// Attempt to become the single daemon instance for `layout`'s store.
/// Writes the current PID to the pidfile (mode `0640`) on success.
pub fn acquire(layout: &StoreLayout) -> Result<PidfileGuard, AtmError> {
    agentmail_core::store::ensure_store(layout)?;
    let path = layout.pidfile_path();

    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o640);
    }
    let mut file = opts.open(&path).map_err(|e| io_err(&path, e))?;

    if file.try_lock_exclusive().is_err() {
        return Err(AtmError::AlreadyRunning);
    }

    file.set_len(0).map_err(|e| io_err(&path, e))?;
    write!(file, "{}", std::process::id()).map_err(|e| io_err(&path, e))?;
    file.flush().map_err(|e| io_err(&path, e))?;

    Ok(PidfileGuard { path, file })
}

/// Query the pidfile without taking ownership of it. If the recorded PID
/// is not alive, the stale file is removed.
pub fn status(layout: &StoreLayout) -> Result<DaemonStatus, AtmError> {
    let path = layout.pidfile_path();
    if !path.exists() {
        return Ok(DaemonStatus::StoppedCleanly);
    }

    let mut file = OpenOptions::new()
        .read(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| io_err(&path, e))?;
    drop(file);
    let pid: Option<u32> = contents.trim().parse().ok();

    match pid {
        Some(pid) if is_pid_alive(pid) => Ok(DaemonStatus::Running { pid }),
        Some(pid) => {
            let _ = std::fs::remove_file(&path);
            Ok(DaemonStatus::StoppedStalePidfile { stale_pid: pid })
        }
        None => {
            let _ = std::fs::remove_file(&path);
            Ok(DaemonStatus::StoppedCleanly)
        }
    }
}

/// Send `SIGTERM` to the running daemon, if any. Returns `false` if the
/// pidfile records no live process.
pub fn stop(layout: &StoreLayout) -> Result<bool, AtmError> {
    match status(layout)? {
        DaemonStatus::Running { pid } => {
            send_sigterm(pid);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(unix)]
fn is_pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_pid_alive(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}

/// Detach the current process into the background: double-fork and
/// `setsid`. The first fork's parent exits immediately; the grandchild is
/// returned to the caller to continue as the daemon.
#[cfg(unix)]
pub fn daemonize() -> std::io::Result<()> {
    unsafe {
        match libc::fork() {
            -1 => return Err(std::io::Error::last_os_error()),
            0 => {}
            _ => std::process::exit(0),
        }

        if libc::setsid() == -1 {
            return Err(std::io::Error::last_os_error());
        }

        match libc::fork() {
            -1 => return Err(std::io::Error::last_os_error()),
            0 => {}
            _ => std::process::exit(0),
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize() -> std::io::Result<()> {
    Err(std::io::Error::other(
        "background daemonization is only supported on Unix",
    ))
}

fn io_err(path: &std::path::Path, source: std::io::Error) -> AtmError {
    AtmError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_writes_current_pid() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let guard = acquire(&layout).unwrap();

        let contents = std::fs::read_to_string(layout.pidfile_path()).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
        drop(guard);
    }

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let _first = acquire(&layout).unwrap();
        assert!(matches!(acquire(&layout), Err(AtmError::AlreadyRunning)));
    }

    #[test]
    fn dropping_the_guard_removes_the_pidfile() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let guard = acquire(&layout).unwrap();
        drop(guard);
        assert!(!layout.pidfile_path().exists());
    }

    #[test]
    fn status_on_missing_pidfile_is_stopped_cleanly() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        assert_eq!(status(&layout).unwrap(), DaemonStatus::StoppedCleanly);
    }

    #[test]
    fn status_while_running_reports_the_pid() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        let _guard = acquire(&layout).unwrap();
        assert_eq!(
            status(&layout).unwrap(),
            DaemonStatus::Running {
                pid: std::process::id()
            }
        );
    }

    #[test]
    fn status_with_a_dead_pid_cleans_up_the_stale_file() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        agentmail_core::store::ensure_store(&layout).unwrap();
        // An astronomically high PID is a reliable "not a process on this
        // system" stand-in without depending on process table contents.
        std::fs::write(layout.pidfile_path(), "999999\n").unwrap();

        let result = status(&layout).unwrap();
        assert_eq!(
            result,
            DaemonStatus::StoppedStalePidfile {
                stale_pid: 999999
            }
        );
        assert!(!layout.pidfile_path().exists());
    }

    #[test]
    fn stop_on_a_stopped_daemon_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join(".agentmail"));
        assert!(!stop(&layout).unwrap());
    }
}
