//! # Digests and Identities
//!
//! Fixed-width SHA-256 values used by the archive log:
//!
//! - [`ContentDigest`]: hash of the raw archived bytes.
//! - [`ChainHash`]: hash binding an entry to its predecessor.
//! - [`Identity`]: the 16-hex-character prefix of a chain hash, used as the
//!   lookup key. Only derivable from a [`ChainHash`], never assigned.
//!
//! All three serialize as lowercase hex strings so that the on-disk form,
//! the JSON output, and the chain-link input agree byte for byte.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChainError;

/// Number of hex characters of the chain hash kept in an [`Identity`].
pub const IDENTITY_LEN: usize = 16;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex_32(s: &str, kind: &'static str) -> Result<[u8; 32], ChainError> {
    if s.len() != 64 {
        return Err(ChainError::InvalidDigest {
            kind,
            reason: format!("expected 64 hex characters, got {}", s.len()),
        });
    }
    if let Some(pos) = s.bytes().position(|b| !b.is_ascii_hexdigit()) {
        return Err(ChainError::InvalidDigest {
            kind,
            reason: format!("non-hex character at offset {pos}"),
        });
    }
    let mut out = [0u8; 32];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        out[i] = (nibble(chunk[0]) << 4) | nibble(chunk[1]);
    }
    Ok(out)
}

// Caller guarantees `b` is an ASCII hex digit.
fn nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// SHA-256 of an archived file's raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex string (either case).
    pub fn from_hex(s: &str) -> Result<Self, ChainError> {
        from_hex_32(s, "content digest").map(Self)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash binding `(predecessor, content digest, link timestamp)`.
///
/// Produced by [`link`](crate::link::link). Entries store it verbatim and
/// verification recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainHash([u8; 32]);

impl ChainHash {
    /// Wrap raw hash bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex string (either case).
    pub fn from_hex(s: &str) -> Result<Self, ChainError> {
        from_hex_32(s, "chain hash").map(Self)
    }

    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Derive the lookup identity of the entry carrying this chain hash.
    pub fn identity(&self) -> Identity {
        let mut hex = self.to_hex();
        hex.truncate(IDENTITY_LEN);
        Identity(hex)
    }
}

impl std::fmt::Display for ChainHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ChainHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Short, stable lookup key of a snapshot entry.
///
/// Obtained from [`ChainHash::identity`]. [`Identity::parse`] exists for
/// user input (CLI arguments, stored rows) and only checks the shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Validate a user-supplied identity. Uppercase hex is normalized.
    pub fn parse(s: &str) -> Result<Self, ChainError> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized.len() != IDENTITY_LEN || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChainError::InvalidIdentity(s.to_string()));
        }
        Ok(Self(normalized))
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn hex_roundtrip_preserves_value() {
        let d = ContentDigest::from_hex(HELLO_SHA256).unwrap();
        assert_eq!(d.to_hex(), HELLO_SHA256);
        assert_eq!(d.to_string(), HELLO_SHA256);
    }

    #[test]
    fn uppercase_hex_is_accepted_and_normalized() {
        let d = ChainHash::from_hex(&HELLO_SHA256.to_uppercase()).unwrap();
        assert_eq!(d.to_hex(), HELLO_SHA256);
    }

    #[test]
    fn rejects_short_input() {
        let err = ContentDigest::from_hex("abc123").unwrap_err();
        assert!(err.to_string().contains("expected 64 hex characters"));
    }

    #[test]
    fn rejects_non_hex_input() {
        let bad = "zz".repeat(32);
        let err = ChainHash::from_hex(&bad).unwrap_err();
        assert!(matches!(err, ChainError::InvalidDigest { kind: "chain hash", .. }));
    }

    #[test]
    fn rejects_multibyte_input_without_panicking() {
        let bad = format!("{}é", "a".repeat(62));
        assert_eq!(bad.len(), 64);
        assert!(ContentDigest::from_hex(&bad).is_err());
    }

    #[test]
    fn identity_is_sixteen_char_prefix() {
        let h = ChainHash::from_hex(HELLO_SHA256).unwrap();
        let id = h.identity();
        assert_eq!(id.as_str(), &HELLO_SHA256[..16]);
        assert_eq!(id, Identity::parse(&HELLO_SHA256[..16]).unwrap());
    }

    #[test]
    fn identity_parse_rejects_wrong_shapes() {
        assert!(Identity::parse("abc").is_err());
        assert!(Identity::parse(&"g".repeat(16)).is_err());
        assert!(Identity::parse(&"a".repeat(17)).is_err());
        assert_eq!(Identity::parse(" 2CF24DBA5FB0A30E ").unwrap().as_str(), "2cf24dba5fb0a30e");
    }

    #[test]
    fn serde_uses_hex_strings() {
        let h = ChainHash::from_hex(HELLO_SHA256).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{HELLO_SHA256}\""));
        let back: ChainHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert!(serde_json::from_str::<ContentDigest>("\"nope\"").is_err());
    }
}
