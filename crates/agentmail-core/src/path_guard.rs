//! Path guard: keeps recipient-derived filenames inside `mailboxes/`.

use crate::error::AtmError;
use std::path::{Component, Path, PathBuf};

/// Join `name` onto `base`, rejecting any `name` that would let the result
/// escape `base` once lexically normalized.
///
/// Recipient names are window names, not paths: a valid name is a single
/// path component with no `..`, no absolute prefix, and no embedded
/// separator. This is checked on the string itself (no filesystem access,
/// no symlink resolution) before any join happens.
pub fn safe_join(base: &Path, name: &str) -> Result<PathBuf, AtmError> {
    if name.is_empty() {
        return Err(AtmError::InvalidPath {
            name: name.to_string(),
        });
    }

    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return Err(AtmError::InvalidPath {
            name: name.to_string(),
        });
    }

    let mut components = candidate.components();
    let first = components.next();
    if components.next().is_some() {
        // More than one component: contains a separator (e.g. "a/b").
        return Err(AtmError::InvalidPath {
            name: name.to_string(),
        });
    }
    match first {
        Some(Component::Normal(_)) => {}
        _ => {
            return Err(AtmError::InvalidPath {
                name: name.to_string(),
            });
        }
    }

    let joined = base.join(name);
    if !joined.starts_with(base) {
        return Err(AtmError::InvalidPath {
            name: name.to_string(),
        });
    }

    Ok(joined)
}
