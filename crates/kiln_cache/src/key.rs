//! Composite cache key and its fixed-width text encoding.
//!
//! The key file holds `device ‖ source ‖ artifact` with no delimiters. Since
//! every fingerprint is exactly 20 characters, the encoding is always 60
//! characters and splits back at fixed offsets.

use std::fmt;

use kiln_common::{Fingerprint, FINGERPRINT_LEN};
use serde::{Deserialize, Serialize};

/// Length of an encoded [`CacheKey`].
pub const KEY_LEN: usize = 3 * FINGERPRINT_LEN;

/// The three fingerprints that identify a valid cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Fingerprint of the device the binary was built for.
    pub device: Fingerprint,
    /// Fingerprint of the kernel source (and options, when enabled).
    pub source: Fingerprint,
    /// Fingerprint of the compiled binary.
    pub artifact: Fingerprint,
}

/// One field of a [`CacheKey`], in verification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    /// The device fingerprint.
    Device,
    /// The source fingerprint.
    Source,
    /// The artifact fingerprint.
    Artifact,
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyField::Device => "device",
            KeyField::Source => "source",
            KeyField::Artifact => "artifact",
        })
    }
}

impl CacheKey {
    /// Creates a key from its three fields.
    pub fn new(device: Fingerprint, source: Fingerprint, artifact: Fingerprint) -> Self {
        Self {
            device,
            source,
            artifact,
        }
    }

    /// Encodes the key as 60 characters: device, source, artifact.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(KEY_LEN);
        out.push_str(self.device.as_str());
        out.push_str(self.source.as_str());
        out.push_str(self.artifact.as_str());
        out
    }

    /// Decodes a key file's contents.
    ///
    /// Returns `None` for anything that is not exactly 60 bytes of three valid
    /// fingerprints. Callers treat `None` as a cache miss.
    pub fn decode(text: &str) -> Option<Self> {
        if text.len() != KEY_LEN {
            return None;
        }
        let field = |i: usize| {
            text.get(i * FINGERPRINT_LEN..(i + 1) * FINGERPRINT_LEN)
                .and_then(Fingerprint::parse)
        };
        Some(Self {
            device: field(0)?,
            source: field(1)?,
            artifact: field(2)?,
        })
    }

    /// Returns the first field, in device → source → artifact order, that
    /// differs from `other`.
    pub fn first_mismatch(&self, other: &CacheKey) -> Option<KeyField> {
        if self.device != other.device {
            Some(KeyField::Device)
        } else if self.source != other.source {
            Some(KeyField::Source)
        } else if self.artifact != other.artifact {
            Some(KeyField::Artifact)
        } else {
            None
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CacheKey {
        CacheKey::new(
            Fingerprint::of(b"device"),
            Fingerprint::of(b"source"),
            Fingerprint::of(b"artifact"),
        )
    }

    #[test]
    fn encode_is_fixed_length_concatenation() {
        let key = sample();
        let text = key.encode();
        assert_eq!(text.len(), KEY_LEN);
        assert_eq!(
            text,
            format!("{}{}{}", key.device, key.source, key.artifact)
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let key = sample();
        assert_eq!(CacheKey::decode(&key.encode()), Some(key));
    }

    #[test]
    fn decode_inverts_encode_for_padded_fields() {
        let key = CacheKey::new(
            Fingerprint::from_digest("1"),
            Fingerprint::from_digest("18446744073709551615"),
            Fingerprint::from_digest("XXXXXXXXXXXXXXXXXXXXXXXX"),
        );
        assert_eq!(CacheKey::decode(&key.encode()), Some(key));
    }

    #[test]
    fn decode_rejects_other_lengths() {
        let text = sample().encode();
        assert!(CacheKey::decode("").is_none());
        assert!(CacheKey::decode(&text[..59]).is_none());
        assert!(CacheKey::decode(&format!("{text}0")).is_none());
        assert!(CacheKey::decode(&format!("{text}\n")).is_none());
    }

    #[test]
    fn decode_rejects_non_printable() {
        let mut text = sample().encode();
        text.replace_range(25..26, " ");
        assert!(CacheKey::decode(&text).is_none());
    }

    #[test]
    fn decode_rejects_multibyte_text() {
        // 60 bytes, but a field boundary falls inside a character.
        let text = format!("{}\u{e9}{}", "a".repeat(19), "b".repeat(39));
        assert_eq!(text.len(), KEY_LEN);
        assert!(CacheKey::decode(&text).is_none());
    }

    #[test]
    fn first_mismatch_order() {
        let key = sample();
        assert_eq!(key.first_mismatch(&key), None);

        let mut other = key;
        other.artifact = Fingerprint::of(b"other");
        assert_eq!(key.first_mismatch(&other), Some(KeyField::Artifact));

        other.source = Fingerprint::of(b"other");
        assert_eq!(key.first_mismatch(&other), Some(KeyField::Source));

        other.device = Fingerprint::of(b"other");
        assert_eq!(key.first_mismatch(&other), Some(KeyField::Device));
    }
}
