//! `receive` command.

use clap::Args;

use super::{mail_ops, report_error};

/// Claim your oldest unread message
#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// tmux-hook mode: silent except for a one-line stderr notification
    /// when mail is waiting, and exit 2 only in that case.
    #[arg(long)]
    hook: bool,
}

pub fn execute(args: ReceiveArgs) -> i32 {
    let ops = mail_ops();
    let result = ops.receive(chrono::Utc::now());

    if args.hook {
        // Every other outcome, including every error, is silent and exits 0:
        // a hook firing on every tmux keystroke must never be noisy.
        return match result {
            Ok(Some(msg)) => {
                eprintln!("agentmail: new message from {}", msg.from);
                2
            }
            _ => 0,
        };
    }

    match result {
        Ok(Some(msg)) => {
            match serde_json::to_string(&msg) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{{\"from\":\"{}\",\"id\":\"{}\"}}", msg.from, msg.id),
            }
            0
        }
        Ok(None) => {
            println!("No unread messages");
            0
        }
        Err(e) => report_error(&e),
    }
}
