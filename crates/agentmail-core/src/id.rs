//! Message identifier generation.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of a generated message identifier, in characters.
pub const ID_LEN: usize = 8;

/// Generate an 8-character identifier over `[A-Za-z0-9]`.
///
/// Each character is sampled independently and uniformly from the
/// 62-symbol alphabet using the OS-backed cryptographic generator
/// (`rand::thread_rng`, seeded from `OsRng`). At ~47 bits of entropy this
/// is meant for human disambiguation in logs and `send` output, not as a
/// uniqueness guarantee the store enforces — duplicates are accepted.
pub fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
