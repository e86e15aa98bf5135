//! `cleanup` command.

use clap::Args;

use super::{mail_ops, report_error};

/// Remove stale ledger records and delivered mail
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Remove ledger records untouched for this many hours
    #[arg(long, default_value_t = 24)]
    stale_hours: i64,

    /// Accepted for interface parity with other mail-retention CLIs.
    /// Messages carry no per-message timestamp (spec's data model has
    /// none), so delivered mail is always removed wholesale regardless
    /// of age; this flag has no effect.
    #[arg(long)]
    delivered_hours: Option<i64>,

    /// Report what would be removed without modifying anything
    #[arg(long)]
    dry_run: bool,
}

pub fn execute(args: CleanupArgs) -> i32 {
    if args.delivered_hours.is_some() {
        eprintln!("note: --delivered-hours has no effect; delivered mail has no timestamp to age against");
    }

    let ops = mail_ops();
    let threshold = chrono::Duration::hours(args.stale_hours);
    match ops.cleanup_sweep(chrono::Utc::now(), threshold, args.dry_run) {
        Ok(report) => {
            println!(
                "ledger: {} stale, {} offline removed",
                report.removed_ledger_stale, report.removed_ledger_offline
            );
            println!(
                "mailboxes: {} messages, {} empty files removed",
                report.removed_messages, report.removed_empty_mailboxes
            );
            0
        }
        Err(e) => report_error(&e),
    }
}
