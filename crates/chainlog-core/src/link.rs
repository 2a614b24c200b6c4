//! # Chain Linking
//!
//! Derives an entry's chain hash from its predecessor, its content digest,
//! and its link timestamp:
//!
//! ```text
//! chain_hash = SHA256(utf8("{predecessor}:{content_digest_hex}:{timestamp_nanos}"))
//! ```
//!
//! `predecessor` renders as the literal `GENESIS` for the root entry and as
//! 64 lowercase hex characters otherwise; the timestamp is a base-10 signed
//! integer. Neither rendering can contain `:`, so the separator is
//! unambiguous.
//!
//! The nanosecond timestamp keeps two appends of identical content against
//! the same tail from colliding. It is a uniqueness aid only; the store's
//! unique identity constraint is what actually rejects collisions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::digest::{ChainHash, ContentDigest};
use crate::error::ChainError;
use crate::temporal::LinkTimestamp;

/// Sentinel rendering of the root entry's predecessor.
pub const GENESIS: &str = "GENESIS";

/// What an entry links back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predecessor {
    /// The entry is the chain root.
    Genesis,
    /// The chain hash of the preceding entry.
    Entry(ChainHash),
}

impl Predecessor {
    /// Parse the stored rendering: `GENESIS` or a 64-hex-char chain hash.
    pub fn parse(s: &str) -> Result<Self, ChainError> {
        if s == GENESIS {
            Ok(Self::Genesis)
        } else {
            ChainHash::from_hex(s).map(Self::Entry)
        }
    }

    /// True for the root sentinel.
    pub fn is_genesis(&self) -> bool {
        matches!(self, Self::Genesis)
    }

    /// The chain hash referenced, if any.
    pub fn chain_hash(&self) -> Option<&ChainHash> {
        match self {
            Self::Genesis => None,
            Self::Entry(h) => Some(h),
        }
    }
}

impl From<ChainHash> for Predecessor {
    fn from(h: ChainHash) -> Self {
        Self::Entry(h)
    }
}

impl std::fmt::Display for Predecessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Genesis => f.write_str(GENESIS),
            Self::Entry(h) => write!(f, "{h}"),
        }
    }
}

impl Serialize for Predecessor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Predecessor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the chain hash binding `predecessor`, `content`, and `timestamp`.
pub fn link(predecessor: &Predecessor, content: &ContentDigest, timestamp: LinkTimestamp) -> ChainHash {
    let payload = format!("{predecessor}:{}:{}", content.to_hex(), timestamp.as_nanos());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&Sha256::digest(payload.as_bytes()));
    ChainHash::from_bytes(bytes)
}
