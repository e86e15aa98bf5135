//! `status` command.

use clap::Args;

use super::{mail_ops, report_error};

/// Declare your availability
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// One of: ready, work, offline
    value: String,
}

pub fn execute(args: StatusArgs) -> i32 {
    let ops = mail_ops();
    match ops.set_status(&args.value, chrono::Utc::now()) {
        Ok(()) => 0,
        Err(e) => report_error(&e),
    }
}
