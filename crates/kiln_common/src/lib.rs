//! Shared foundational types used across the Kiln kernel cache.
//!
//! This crate provides the content hash used to identify byte sequences and
//! the fixed-width [`Fingerprint`] stored in cache keys.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod hash;

pub use fingerprint::{Fingerprint, FINGERPRINT_LEN};
pub use hash::ContentHash;
