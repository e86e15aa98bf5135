//! Core store, ledger, and notifier-policy library shared by every
//! AgentMail binary.

pub mod config;
pub mod error;
pub mod id;
pub mod ignore;
pub mod io;
pub mod ledger;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod multiplexer;
pub mod ops;
pub mod path_guard;
pub mod policy;
pub mod store;

pub use error::AtmError;
pub use ledger::{RecipientState, Status};
pub use mailbox::{append, claim_first_unread, find_unread, mark_as_read};
pub use message::Message;
pub use multiplexer::{Multiplexer, TmuxMultiplexer};
pub use ops::{CleanupReport, MailOps, ReceivedMessage, RecipientInfo};
pub use store::StoreLayout;
