//! agentmail - file-backed mail between tmux-window agents.

use clap::Parser;

mod commands;

use commands::Cli;

fn main() {
    agentmail_core::logging::init();
    let cli = Cli::parse();
    let exit_code = cli.execute();
    std::process::exit(exit_code);
}
