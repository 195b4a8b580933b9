//! Compiled-kernel build cache.
//!
//! Persists compiled kernel binaries next to a composite fingerprint of the
//! device, the kernel source and the binary itself, and verifies that
//! fingerprint before a cached binary is handed back to the compute backend.

#![warn(missing_docs)]

pub mod backend;
pub mod build;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod lock;
pub mod name;
pub mod store;

pub use backend::{CompilerBackend, Compiled, DeviceDescriptor, Diagnostic, StaticDevice};
pub use build::{BuildCache, BuildOutcome, BuildOutput, CacheStatus, MissReason};
pub use error::{BuildError, CacheError};
pub use key::{CacheKey, KeyField, KEY_LEN};
pub use lock::CacheLock;
pub use name::cache_name_from_path;
pub use store::CacheStore;
