//! Fixed-width printable fingerprints.
//!
//! A [`Fingerprint`] is always exactly [`FINGERPRINT_LEN`] printable ASCII
//! characters. Concatenating fingerprints therefore yields a string that can be
//! split back into its fields without delimiters.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::hash::ContentHash;

/// Number of characters in every fingerprint.
pub const FINGERPRINT_LEN: usize = 20;

/// Filler appended to digests shorter than [`FINGERPRINT_LEN`].
pub const PAD_CHAR: u8 = b'X';

/// A 20-character content identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprints a byte sequence.
    ///
    /// The XXH3-128 digest is rendered as hex and cut to the first 20
    /// characters, so the result never needs padding.
    pub fn of(data: &[u8]) -> Self {
        Self::from_hash(&ContentHash::from_bytes(data))
    }

    /// Builds a fingerprint from an already computed content hash.
    pub fn from_hash(hash: &ContentHash) -> Self {
        Self::from_digest(&hash.to_string())
    }

    /// Normalizes an arbitrary digest string to exactly 20 characters.
    ///
    /// Shorter digests are right-padded with `'X'`; longer ones are truncated.
    /// Characters outside printable ASCII are replaced with `'_'`.
    pub fn from_digest(digest: &str) -> Self {
        let mut out = [PAD_CHAR; FINGERPRINT_LEN];
        for (slot, ch) in out.iter_mut().zip(digest.chars()) {
            *slot = if ch.is_ascii_graphic() { ch as u8 } else { b'_' };
        }
        Self(out)
    }

    /// Parses a stored fingerprint.
    ///
    /// Returns `None` unless `text` is exactly 20 printable ASCII characters.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != FINGERPRINT_LEN || !bytes.iter().all(u8::is_ascii_graphic) {
            return None;
        }
        let mut out = [0u8; FINGERPRINT_LEN];
        out.copy_from_slice(bytes);
        Some(Self(out))
    }

    /// Returns the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction only admits printable ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.as_str())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FingerprintVisitor;

        impl Visitor<'_> for FingerprintVisitor {
            type Value = Fingerprint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a {FINGERPRINT_LEN}-character printable ASCII string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Fingerprint, E> {
                Fingerprint::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(FingerprintVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_is_fixed_width_hex() {
        for input in [&b""[..], b"a", b"__kernel void blur() {}"] {
            let fp = Fingerprint::of(input);
            assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
            assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn of_is_deterministic() {
        assert_eq!(Fingerprint::of(b"KERNEL_A"), Fingerprint::of(b"KERNEL_A"));
        assert_ne!(Fingerprint::of(b"KERNEL_A"), Fingerprint::of(b"KERNEL_B"));
    }

    #[test]
    fn of_is_prefix_of_content_hash() {
        let hash = ContentHash::from_bytes(b"shader");
        let fp = Fingerprint::of(b"shader");
        assert!(hash.to_string().starts_with(fp.as_str()));
    }

    #[test]
    fn short_digest_is_padded() {
        let fp = Fingerprint::from_digest("1234567");
        assert_eq!(fp.as_str(), "1234567XXXXXXXXXXXXX");
    }

    #[test]
    fn long_digest_is_truncated() {
        let fp = Fingerprint::from_digest("123456789012345678901234");
        assert_eq!(fp.as_str(), "12345678901234567890");
    }

    #[test]
    fn non_printable_is_replaced() {
        let fp = Fingerprint::from_digest("ab cd\u{e9}");
        assert_eq!(&fp.as_str()[..6], "ab_cd_");
    }

    #[test]
    fn parse_requires_exact_length() {
        assert!(Fingerprint::parse("0123456789abcdef0123").is_some());
        assert!(Fingerprint::parse("0123456789abcdef012").is_none());
        assert!(Fingerprint::parse("0123456789abcdef01234").is_none());
        assert!(Fingerprint::parse("").is_none());
    }

    #[test]
    fn parse_rejects_whitespace() {
        assert!(Fingerprint::parse("0123456789abcdef012 ").is_none());
    }

    #[test]
    fn parse_accepts_padded_digest() {
        let fp = Fingerprint::from_digest("42");
        assert_eq!(Fingerprint::parse(fp.as_str()), Some(fp));
    }

    #[test]
    fn serde_as_string() {
        let fp = Fingerprint::of(b"serde");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{fp}\""));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn serde_rejects_wrong_length() {
        let result: Result<Fingerprint, _> = serde_json::from_str("\"short\"");
        assert!(result.is_err());
    }
}
