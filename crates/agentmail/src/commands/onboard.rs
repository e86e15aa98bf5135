//! `onboard` command (supplemented: not in the external interface spec,
//! but a natural fit given that identity is resolved from the current
//! tmux window everywhere else).

use agentmail_core::{Multiplexer, TmuxMultiplexer};

pub fn execute() -> i32 {
    match TmuxMultiplexer.current_window() {
        Ok(Some(name)) => {
            println!("You are window \"{name}\".");
            println!("Try: agentmail recipients   # see who else you can message");
            println!("     agentmail send <recipient> <message>");
            0
        }
        Ok(None) => {
            eprintln!("error: not inside a multiplexer session");
            2
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}
