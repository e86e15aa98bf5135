//! The `Message` record stored one-per-line in each recipient's mailbox.

use serde::{Deserialize, Serialize};

/// Maximum message body size, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 65536;

/// One piece of mail. Immutable after append except for `read_flag`,
/// which transitions `false` → `true` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 8-character identifier over `[A-Za-z0-9]`. Not guaranteed unique;
    /// used for human disambiguation and `mark_as_read` lookups.
    pub id: String,
    /// Sender window name.
    pub from: String,
    /// Recipient window name.
    pub to: String,
    /// Arbitrary UTF-8 text, 1..=65536 bytes.
    pub message: String,
    /// Whether the recipient has consumed this message via `receive`.
    #[serde(default)]
    pub read_flag: bool,
}
