//! `send` command.

use clap::Args;

use super::{mail_ops, report_error};

/// Deliver a message to a recipient window
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Target window name
    recipient: String,

    /// Message body
    message: String,
}

pub fn execute(args: SendArgs) -> i32 {
    let ops = mail_ops();
    match ops.send(&args.recipient, &args.message) {
        Ok(id) => {
            println!("{id}");
            0
        }
        Err(e) => report_error(&e),
    }
}
