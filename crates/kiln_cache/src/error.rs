//! Error types for cache and build operations.

use std::path::PathBuf;

use crate::backend::Diagnostic;

/// Errors that can occur while touching the cache directory.
///
/// Cache reads are fail-safe: the orchestrator turns these into cache misses.
/// They only reach callers that use [`CacheStore`](crate::CacheStore) or
/// [`CacheLock`](crate::CacheLock) directly.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Another builder held the per-name lock for longer than the timeout.
    #[error("timed out waiting for cache lock {path}")]
    LockTimeout {
        /// The lock file path.
        path: PathBuf,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort a [`BuildCache::build`](crate::BuildCache::build) call.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The kernel source was empty.
    #[error("kernel source is empty")]
    EmptySource,

    /// The cache name cannot be used as a file stem.
    #[error("invalid cache name '{0}'")]
    InvalidName(String),

    /// The backend failed to compile the kernel source.
    #[error("failed to compile '{name}': {diagnostic}")]
    Compile {
        /// Cache name of the kernel being built.
        name: String,
        /// The backend's build log.
        diagnostic: Diagnostic,
    },
}
