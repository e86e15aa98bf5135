//! `recipients` command.

use super::{mail_ops, report_error};

pub fn execute() -> i32 {
    let ops = mail_ops();
    match ops.list_recipients() {
        Ok(recipients) => {
            for r in recipients {
                if r.is_current {
                    println!("{} (you)", r.name);
                } else {
                    println!("{}", r.name);
                }
            }
            0
        }
        Err(e) => report_error(&e),
    }
}
