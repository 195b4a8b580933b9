//! Build orchestration: reuse a verified cached binary or compile and store.
//!
//! A [`BuildCache`] runs one build at a time per cache name:
//!
//! 1. Look up `<name>.key` and decode it.
//! 2. Verify the device, source and artifact fingerprints, in that order,
//!    stopping at the first mismatch.
//! 3. On a hit, hand the cached binary to the backend.
//! 4. On a miss, compile from source and write a fresh entry.
//!
//! Every problem with the cache itself degrades to a miss. Only a compile
//! failure aborts the build.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use kiln_common::Fingerprint;
use tracing::{debug, info, warn};

use crate::backend::{CompilerBackend, DeviceDescriptor};
use crate::error::{BuildError, CacheError};
use crate::fingerprint::{
    artifact_fingerprint, build_fingerprint, device_fingerprint_of, source_fingerprint,
};
use crate::key::{CacheKey, KeyField};
use crate::lock::CacheLock;
use crate::name::is_valid_cache_name;
use crate::store::CacheStore;

/// Default time to wait for another builder holding the same cache name.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a cache entry could not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No key file exists.
    NoKey,
    /// A cache file exists but could not be read.
    Unreadable,
    /// The key file is not a 60-character key.
    Undecodable,
    /// The entry was built for a different device.
    DeviceChanged,
    /// The entry was built from different source or options.
    SourceChanged,
    /// The key is valid but the binary is missing or empty.
    NoArtifact,
    /// The binary on disk does not match the key.
    ArtifactChanged,
    /// The backend refused to load the cached binary.
    LoadRejected,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissReason::NoKey => "no cache entry",
            MissReason::Unreadable => "cache entry unreadable",
            MissReason::Undecodable => "malformed key file",
            MissReason::DeviceChanged => "device changed",
            MissReason::SourceChanged => "source changed",
            MissReason::NoArtifact => "binary missing",
            MissReason::ArtifactChanged => "binary does not match key",
            MissReason::LoadRejected => "backend rejected cached binary",
        })
    }
}

impl From<KeyField> for MissReason {
    fn from(field: KeyField) -> Self {
        match field {
            KeyField::Device => MissReason::DeviceChanged,
            KeyField::Source => MissReason::SourceChanged,
            KeyField::Artifact => MissReason::ArtifactChanged,
        }
    }
}

/// How a successful build obtained its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The cached binary was verified and loaded.
    Hit,
    /// The kernel was compiled from source.
    Miss {
        /// Why the cache could not be used.
        reason: MissReason,
        /// Whether the fresh binary was written back to the cache.
        stored: bool,
    },
}

impl BuildOutcome {
    /// Returns `true` for a cache hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, BuildOutcome::Hit)
    }
}

/// Result of a successful [`BuildCache::build`].
#[derive(Debug)]
pub struct BuildOutput<P> {
    /// The backend's program handle.
    pub program: P,
    /// The binary the program was built from.
    pub artifact: Vec<u8>,
    /// Whether the cache was used.
    pub outcome: BuildOutcome,
}

/// Result of [`BuildCache::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The entry would be reused by the next build.
    Valid,
    /// The next build would compile from source.
    Invalid(MissReason),
}

/// Compiled-kernel cache bound to one directory.
#[derive(Debug, Clone)]
pub struct BuildCache {
    store: CacheStore,
    fingerprint_options: bool,
    locking: bool,
    lock_timeout: Duration,
}

impl BuildCache {
    /// Creates a cache rooted at `dir` with default settings.
    pub fn new(dir: &Path) -> Self {
        Self {
            store: CacheStore::new(dir),
            fingerprint_options: true,
            locking: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets whether compile options are part of the source fingerprint.
    ///
    /// When disabled, changing only the options reuses a binary that was
    /// compiled with different options.
    pub fn fingerprint_options(mut self, enabled: bool) -> Self {
        self.fingerprint_options = enabled;
        self
    }

    /// Sets whether builds take the per-name lock.
    pub fn locking(mut self, enabled: bool) -> Self {
        self.locking = enabled;
        self
    }

    /// Sets how long to wait for the per-name lock.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Source fingerprint as stored in the key for these inputs.
    pub fn source_key(&self, source: &str, options: &str) -> Fingerprint {
        if self.fingerprint_options {
            build_fingerprint(source, options)
        } else {
            source_fingerprint(source)
        }
    }

    /// Builds a kernel, reusing the cached binary when it verifies.
    ///
    /// Fails only for empty source, an unusable cache name, or a compile
    /// error. A failure to persist the fresh binary is logged and reported
    /// through the `stored` flag of [`BuildOutcome::Miss`].
    pub fn build<B: CompilerBackend>(
        &self,
        backend: &mut B,
        device: &dyn DeviceDescriptor,
        name: &str,
        source: &str,
        options: &str,
    ) -> Result<BuildOutput<B::Program>, BuildError> {
        if source.is_empty() {
            return Err(BuildError::EmptySource);
        }
        if !is_valid_cache_name(name) {
            return Err(BuildError::InvalidName(name.to_string()));
        }

        let lock = self.lock(name);
        let may_store = lock.is_ok();
        if let Err(e) = &lock {
            warn!(cache = name, error = %e, "building without cache lock; result will not be stored");
        }

        let source_fp = self.source_key(source, options);

        let reason = match self.lookup(device, name, source_fp) {
            Ok(artifact) => match backend.load_precompiled(&artifact, options) {
                Ok(program) => {
                    info!(cache = name, bytes = artifact.len(), "using cached kernel binary");
                    return Ok(BuildOutput {
                        program,
                        artifact,
                        outcome: BuildOutcome::Hit,
                    });
                }
                Err(diag) => {
                    warn!(cache = name, diagnostic = %diag, "cached kernel binary rejected by backend");
                    MissReason::LoadRejected
                }
            },
            Err(reason) => reason,
        };
        debug!(cache = name, %reason, "cache miss");

        let started = Instant::now();
        let compiled = backend
            .compile_from_source(source, options)
            .map_err(|diagnostic| BuildError::Compile {
                name: name.to_string(),
                diagnostic,
            })?;
        info!(
            cache = name,
            bytes = compiled.artifact.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compiled kernel from source"
        );

        let stored = may_store && self.store_entry(device, name, source_fp, &compiled.artifact);
        drop(lock);

        Ok(BuildOutput {
            program: compiled.program,
            artifact: compiled.artifact,
            outcome: BuildOutcome::Miss { reason, stored },
        })
    }

    /// Checks whether the next build for these inputs would hit the cache.
    ///
    /// Runs the same verification as [`build`](Self::build) without a backend,
    /// so it cannot detect a binary the backend would reject.
    pub fn verify(
        &self,
        device: &dyn DeviceDescriptor,
        name: &str,
        source: &str,
        options: &str,
    ) -> CacheStatus {
        if !is_valid_cache_name(name) {
            return CacheStatus::Invalid(MissReason::NoKey);
        }
        match self.lookup(device, name, self.source_key(source, options)) {
            Ok(_) => CacheStatus::Valid,
            Err(reason) => CacheStatus::Invalid(reason),
        }
    }

    fn lock(&self, name: &str) -> Result<Option<CacheLock>, CacheError> {
        if !self.locking {
            return Ok(None);
        }
        CacheLock::acquire(&self.store.lock_path(name), self.lock_timeout).map(Some)
    }

    /// Returns the verified cached binary, or why there is none.
    fn lookup(
        &self,
        device: &dyn DeviceDescriptor,
        name: &str,
        source_fp: Fingerprint,
    ) -> Result<Vec<u8>, MissReason> {
        let text = self
            .store
            .read_key(name)
            .map_err(|e| unreadable(name, &e))?
            .ok_or(MissReason::NoKey)?;
        let stored = CacheKey::decode(&text).ok_or_else(|| {
            debug!(cache = name, len = text.len(), "key file is not a valid key");
            MissReason::Undecodable
        })?;
        debug!(cache = name, "key verification: decoded");

        // The artifact slot is checked once the binary has been read.
        let mut expected = CacheKey::new(device_fingerprint_of(device), source_fp, stored.artifact);
        if let Some(field) = stored.first_mismatch(&expected) {
            debug!(cache = name, %field, "key verification: mismatch");
            return Err(field.into());
        }
        debug!(cache = name, "key verification: device and source match");

        let artifact = self
            .store
            .read_artifact(name)
            .map_err(|e| unreadable(name, &e))?
            .filter(|bytes| !bytes.is_empty())
            .ok_or(MissReason::NoArtifact)?;
        expected.artifact = artifact_fingerprint(&artifact);
        if let Some(field) = stored.first_mismatch(&expected) {
            debug!(cache = name, %field, "key verification: mismatch");
            return Err(field.into());
        }
        debug!(cache = name, "key verification: artifact matches");

        Ok(artifact)
    }

    /// Writes a fresh entry, returning whether it was persisted.
    fn store_entry(
        &self,
        device: &dyn DeviceDescriptor,
        name: &str,
        source_fp: Fingerprint,
        artifact: &[u8],
    ) -> bool {
        let key = CacheKey::new(
            device_fingerprint_of(device),
            source_fp,
            artifact_fingerprint(artifact),
        );
        match self.store.write(name, &key.encode(), artifact) {
            Ok(()) => {
                info!(cache = name, key = %key, "stored kernel binary in cache");
                true
            }
            Err(e) => {
                warn!(cache = name, error = %e, "failed to store kernel binary; next build will recompile");
                false
            }
        }
    }
}

fn unreadable(name: &str, err: &CacheError) -> MissReason {
    warn!(cache = name, error = %err, "ignoring unreadable cache entry");
    MissReason::Unreadable
}
