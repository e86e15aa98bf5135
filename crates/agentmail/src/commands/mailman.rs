//! `mailman` command: a thin wrapper that launches or queries the
//! `agentmail-mailman` notifier daemon binary.

use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::process::Command;

/// Run or control the notifier daemon
#[derive(Args, Debug)]
pub struct MailmanArgs {
    /// Detach into the background (Unix only)
    #[arg(long)]
    daemon: bool,

    #[command(subcommand)]
    command: Option<MailmanCommand>,
}

#[derive(Subcommand, Debug)]
enum MailmanCommand {
    /// Report whether a daemon is running for this store
    Status,
    /// Stop the running daemon, if any
    Stop,
}

pub fn execute(args: MailmanArgs) -> i32 {
    let mut cmd = Command::new(locate_mailman_binary());

    match args.command {
        Some(MailmanCommand::Status) => {
            cmd.arg("status");
        }
        Some(MailmanCommand::Stop) => {
            cmd.arg("stop");
        }
        None if args.daemon => {
            cmd.arg("--daemon");
        }
        None => {}
    }

    match cmd.status() {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            eprintln!("error: failed to launch agentmail-mailman: {e}");
            1
        }
    }
}

/// Prefer the binary sitting next to this one (the common case for a
/// workspace build); fall back to PATH lookup otherwise.
fn locate_mailman_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let name = if cfg!(windows) {
            "agentmail-mailman.exe"
        } else {
            "agentmail-mailman"
        };
        let sibling = dir.join(name);
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from("agentmail-mailman")
}
