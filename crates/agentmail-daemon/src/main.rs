//! agentmail-mailman - notifier daemon for AgentMail.
//!
//! Watches a store's mailboxes and ledger and nudges idle tmux windows
//! that have unread mail. See `notifier` for the tick itself and
//! `supervisor` for single-instance and lifecycle handling.

mod notifier;
mod supervisor;
#[cfg(test)]
mod test_support;

use agentmail_core::multiplexer::TmuxMultiplexer;
use agentmail_core::store::StoreLayout;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "agentmail-mailman")]
#[command(about = "Notifier daemon for AgentMail")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Detach into the background after starting (Unix only).
    #[arg(short, long)]
    daemon: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether a daemon is currently running for this store.
    Status,
    /// Stop the running daemon, if any.
    Stop,
}

fn main() -> Result<()> {
    agentmail_core::logging::init();
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let layout = StoreLayout::discover(&cwd);

    match cli.command {
        Some(Command::Status) => {
            print_status(&layout)?;
            Ok(())
        }
        Some(Command::Stop) => {
            if supervisor::stop(&layout)? {
                println!("stopped");
            } else {
                println!("not running");
            }
            Ok(())
        }
        None => run_foreground(layout, cli.daemon),
    }
}

fn print_status(layout: &StoreLayout) -> Result<()> {
    match supervisor::status(layout)? {
        supervisor::DaemonStatus::Running { pid } => println!("running (pid {pid})"),
        supervisor::DaemonStatus::StoppedCleanly => println!("stopped"),
        supervisor::DaemonStatus::StoppedStalePidfile { stale_pid } => {
            println!("stopped (cleared stale pidfile for pid {stale_pid})")
        }
    }
    Ok(())
}

fn run_foreground(layout: StoreLayout, daemonize: bool) -> Result<()> {
    if daemonize {
        #[cfg(unix)]
        {
            supervisor::daemonize().context("failed to detach into the background")?;
        }
        #[cfg(not(unix))]
        {
            anyhow::bail!("--daemon is only supported on Unix");
        }
    }

    let guard = supervisor::acquire(&layout).context("failed to start mailman")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the tokio runtime")?;

    runtime.block_on(run_async(layout));
    drop(guard);
    Ok(())
}

async fn run_async(layout: StoreLayout) {
    info!("agentmail-mailman starting for {}", layout.root().display());

    let cancel = CancellationToken::new();
    let cancel_for_signals = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        cancel_for_signals.cancel();
    });

    let mux = TmuxMultiplexer;
    let tracker = notifier::StatelessTracker::new();
    notifier::run(layout, mux, tracker, cancel).await;

    info!("agentmail-mailman shutdown complete");
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(sig) => sig,
            Err(_) => {
                let _ = ctrl_c.await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
