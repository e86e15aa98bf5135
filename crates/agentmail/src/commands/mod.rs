//! CLI command dispatch and execution.

use clap::{Parser, Subcommand};

mod cleanup;
mod mailman;
mod onboard;
mod receive;
mod recipients;
mod send;
mod status;

/// agentmail - file-backed mail between tmux-window agents
#[derive(Parser, Debug)]
#[command(
    name = "agentmail",
    version,
    about = "File-backed mail between tmux-window agents"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deliver a message to a recipient window
    Send(send::SendArgs),

    /// Claim your oldest unread message
    Receive(receive::ReceiveArgs),

    /// Declare your availability
    Status(status::StatusArgs),

    /// List addressable windows
    Recipients,

    /// Run or control the notifier daemon
    Mailman(mailman::MailmanArgs),

    /// Remove stale ledger records and delivered mail
    Cleanup(cleanup::CleanupArgs),

    /// Print your window identity and a usage hint
    Onboard,
}

impl Cli {
    /// Run the selected command and return the process exit code.
    pub fn execute(self) -> i32 {
        match self.command {
            Commands::Send(args) => send::execute(args),
            Commands::Receive(args) => receive::execute(args),
            Commands::Status(args) => status::execute(args),
            Commands::Recipients => recipients::execute(),
            Commands::Mailman(args) => mailman::execute(args),
            Commands::Cleanup(args) => cleanup::execute(args),
            Commands::Onboard => onboard::execute(),
        }
    }
}

/// Build `MailOps` for the store discovered from the current directory.
pub(crate) fn mail_ops()
-> agentmail_core::MailOps<agentmail_core::TmuxMultiplexer> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let layout = agentmail_core::StoreLayout::discover(&cwd);
    agentmail_core::MailOps::new(layout, agentmail_core::TmuxMultiplexer)
}

/// Print `error: <message>` to stderr and map the error to its exit code.
pub(crate) fn report_error(err: &agentmail_core::AtmError) -> i32 {
    eprintln!("error: {err}");
    err.exit_code()
}
