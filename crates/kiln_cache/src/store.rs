//! On-disk layout of cache entries.
//!
//! Each entry is a pair of files sharing the cache name:
//!
//! ```text
//! <dir>/<name>.key   60 ASCII bytes, the encoded CacheKey
//! <dir>/<name>.bin   raw compiled binary
//! ```
//!
//! Writes go through temporary files in the same directory that are renamed
//! into place, so a reader never sees a partially written file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CacheError;

/// File extension of key files.
pub const KEY_EXT: &str = "key";

/// File extension of artifact files.
pub const ARTIFACT_EXT: &str = "bin";

/// File extension of per-name lock files.
pub const LOCK_EXT: &str = "lock";

/// Reads and writes cache entries in one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory holding all entries.
    dir: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the key file for `name`.
    pub fn key_path(&self, name: &str) -> PathBuf {
        self.entry_path(name, KEY_EXT)
    }

    /// Path of the artifact file for `name`.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.entry_path(name, ARTIFACT_EXT)
    }

    /// Path of the lock file for `name`.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.entry_path(name, LOCK_EXT)
    }

    fn entry_path(&self, name: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{name}.{ext}"))
    }

    /// Returns `true` if both files of the entry exist.
    pub fn exists(&self, name: &str) -> bool {
        self.key_path(name).is_file() && self.artifact_path(name).is_file()
    }

    /// Reads the key file.
    ///
    /// Returns `Ok(None)` if it does not exist. Bytes that are not valid UTF-8
    /// are replaced, which the key codec then rejects.
    pub fn read_key(&self, name: &str) -> Result<Option<String>, CacheError> {
        Ok(read_optional(&self.key_path(name))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Reads the artifact file. Returns `Ok(None)` if it does not exist.
    pub fn read_artifact(&self, name: &str) -> Result<Option<Vec<u8>>, CacheError> {
        read_optional(&self.artifact_path(name))
    }

    /// Writes a complete entry.
    ///
    /// Both files are staged as temporaries first; nothing visible changes
    /// unless both were written. The artifact is then renamed into place
    /// before the key. A reader racing the two renames sees a key whose
    /// artifact fingerprint does not match and treats it as a miss.
    pub fn write(&self, name: &str, key: &str, artifact: &[u8]) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let staged_artifact = self.stage(artifact)?;
        let staged_key = self.stage(key.as_bytes())?;

        let artifact_path = self.artifact_path(name);
        staged_artifact
            .persist(&artifact_path)
            .map_err(|e| CacheError::io(&artifact_path, e.error))?;

        let key_path = self.key_path(name);
        staged_key
            .persist(&key_path)
            .map_err(|e| CacheError::io(&key_path, e.error))?;

        debug!(cache = name, bytes = artifact.len(), dir = %self.dir.display(), "cache entry written");
        Ok(())
    }

    /// Writes `data` to a temporary file in the cache directory.
    ///
    /// The temporary is removed again if it is dropped without being persisted.
    fn stage(&self, data: &[u8]) -> Result<NamedTempFile, CacheError> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".kiln-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::io(&self.dir, e))?;
        tmp.write_all(data)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        Ok(tmp)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
