//! Per-cache-name advisory lock.
//!
//! Builders targeting the same cache name serialize on an exclusive OS file
//! lock over `<dir>/<name>.lock`. The lock belongs to the open file handle, so
//! it is released when the guard drops and by the kernel when a builder
//! crashes. No lock is ever taken away from a live holder, however long its
//! compile runs.
//!
//! The lock file itself stays on disk. Unlinking it on release would let a
//! waiter lock the unlinked inode while a newcomer locks a fresh file at the
//! same path.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::CacheError;

/// Interval between attempts while the lock is held by someone else.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Guard for a held per-name lock. Releases the lock on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquires the lock at `path`, waiting up to `timeout`.
    ///
    /// The parent directory and the lock file are created if missing.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| CacheError::io(path, e))?;

        let deadline = Instant::now() + timeout;
        let mut contended = false;
        loop {
            match file.try_lock() {
                Ok(()) => break,
                Err(TryLockError::WouldBlock) => {
                    if !contended {
                        debug!(path = %path.display(), "waiting for cache lock");
                        contended = true;
                    }
                    if Instant::now() >= deadline {
                        return Err(CacheError::LockTimeout {
                            path: path.to_path_buf(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(TryLockError::Error(e)) => return Err(CacheError::io(path, e)),
            }
        }

        let lock = Self {
            file,
            path: path.to_path_buf(),
        };
        if let Err(e) = lock.record_holder() {
            debug!(path = %path.display(), error = %e, "could not record lock holder");
        }
        debug!(path = %path.display(), "cache lock acquired");
        Ok(lock)
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the holder's pid into the lock file for diagnostics.
    fn record_holder(&self) -> io::Result<()> {
        let mut file = &self.file;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", std::process::id())
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "failed to release cache lock");
        }
    }
}
