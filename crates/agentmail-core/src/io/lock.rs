//! Advisory file locking for mailbox and ledger files.
//!
//! Every read-modify-write against the store blocks on one of these locks
//! for the duration of the critical section (spec §5); there is no
//! timeout and no retry-with-backoff here — the lock is acquired, used,
//! and released before the caller continues.

use fs2::FileExt;
use std::fs::File;

/// A held advisory lock on an open file descriptor. Unlocking happens on
/// drop, before the underlying file is closed.
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Block until an exclusive lock on `file` is acquired.
    pub fn exclusive(file: File) -> std::io::Result<Self> {
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    /// Block until a shared lock on `file` is acquired.
    pub fn shared(file: File) -> std::io::Result<Self> {
        file.lock_shared()?;
        Ok(Self { file })
    }

    /// Access the locked file.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Access the locked file mutably.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
