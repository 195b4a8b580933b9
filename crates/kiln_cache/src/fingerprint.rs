//! Derivation of the three fingerprints stored in a cache key.
//!
//! All functions are pure: identical inputs give identical fingerprints, and
//! nothing depends on time or file metadata.

use kiln_common::{ContentHash, Fingerprint};

use crate::backend::DeviceDescriptor;

/// Fingerprints a device from its name, vendor and version, in that order.
pub fn device_fingerprint(name: &str, vendor: &str, version: &str) -> Fingerprint {
    Fingerprint::from_hash(&ContentHash::from_parts(&[
        name.as_bytes(),
        vendor.as_bytes(),
        version.as_bytes(),
    ]))
}

/// Fingerprints the device behind a descriptor.
pub fn device_fingerprint_of(device: &dyn DeviceDescriptor) -> Fingerprint {
    let (name, vendor, version) = device.describe();
    device_fingerprint(&name, &vendor, &version)
}

/// Fingerprints kernel source exactly as it is passed to the compiler.
pub fn source_fingerprint(source: &str) -> Fingerprint {
    Fingerprint::of(source.as_bytes())
}

/// Fingerprints kernel source together with its compile options.
///
/// With empty options this is identical to [`source_fingerprint`]. Otherwise a
/// NUL separator keeps `("ab", "c")` and `("a", "bc")` apart.
pub fn build_fingerprint(source: &str, options: &str) -> Fingerprint {
    if options.is_empty() {
        return source_fingerprint(source);
    }
    Fingerprint::from_hash(&ContentHash::from_parts(&[
        source.as_bytes(),
        b"\0",
        options.as_bytes(),
    ]))
}

/// Fingerprints a compiled binary.
pub fn artifact_fingerprint(binary: &[u8]) -> Fingerprint {
    Fingerprint::of(binary)
}
