//! # Snapshot Entries
//!
//! The record type of the archive log and its two mutable metadata fields.
//!
//! Hash-bearing fields (`content_digest`, `chain_hash`, `predecessor`,
//! `link_timestamp`) are fixed when the store appends the entry. Only
//! [`PinLocator`] and [`Tags`] change afterwards, and neither takes part in
//! the chain hash.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::{ChainHash, ContentDigest, Identity};
use crate::error::ChainError;
use crate::link::Predecessor;
use crate::temporal::LinkTimestamp;

/// Operator labels attached to an entry.
///
/// Accepted as a comma-delimited string; items are trimmed, empty items
/// dropped, duplicates collapsed. Rendered sorted and comma-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// No tags.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a comma-delimited list.
    pub fn parse(s: &str) -> Self {
        Self(
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// True when there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `tag` is present.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Iterate tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let joined: Vec<String> = iter.into_iter().map(Into::into).collect();
        Self::parse(&joined.join(","))
    }
}

impl std::fmt::Display for Tags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<String>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

/// Opaque reference to the entry's content on an external pinning network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PinLocator(String);

impl PinLocator {
    /// Accept any non-blank locator, trimmed.
    pub fn new(locator: impl Into<String>) -> Result<Self, ChainError> {
        let locator = locator.into();
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(ChainError::EmptyPinLocator);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The locator as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PinLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PinLocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied fields of an entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    /// Absolute path of the archived content.
    pub source_path: String,
    /// SHA-256 of the content bytes.
    pub content_digest: ContentDigest,
    /// Content length in bytes.
    pub size_bytes: u64,
    /// Operator labels.
    pub tags: Tags,
}

/// One archived-content record of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Append position assigned by the store (1 for the first append).
    pub sequence: i64,
    /// Lookup key derived from `chain_hash`.
    pub identity: Identity,
    /// Path of the content at archive time. Informational.
    pub source_path: String,
    /// SHA-256 of the content bytes at archive time.
    pub content_digest: ContentDigest,
    /// Hash binding predecessor, content digest, and link timestamp.
    pub chain_hash: ChainHash,
    /// Chain hash of the preceding entry, or genesis.
    pub predecessor: Predecessor,
    /// Content length in bytes at archive time.
    pub size_bytes: u64,
    /// Coarse archival time in Unix seconds. Not part of the chain hash.
    pub archived_at_seconds: i64,
    /// Exact instant folded into `chain_hash`. `None` only for entries
    /// imported from logs that never retained it.
    pub link_timestamp: Option<LinkTimestamp>,
    /// Late-bound external locator.
    pub pin_locator: Option<PinLocator>,
    /// Operator labels.
    pub tags: Tags,
}

impl SnapshotEntry {
    /// True when this entry claims to be the chain root.
    pub fn is_root(&self) -> bool {
        self.predecessor.is_genesis()
    }
}

/// A stored row whose fields could not all be decoded.
///
/// Hash-bearing values that still parse are kept so that verification can
/// go on checking the rows around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorruptRecord {
    /// Append position assigned by the store.
    pub sequence: i64,
    /// Stored identity, when it parses.
    pub identity: Option<Identity>,
    /// Stored predecessor, when it parses.
    pub predecessor: Option<Predecessor>,
    /// Stored chain hash, when it parses.
    pub chain_hash: Option<ChainHash>,
    /// First column that failed to decode.
    pub field: String,
    /// Why it failed.
    pub reason: String,
}

/// One row of a raw log scan: a decoded entry or a corrupt row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChainRecord {
    /// Every field decoded.
    Entry(SnapshotEntry),
    /// At least one field did not decode.
    Corrupt(CorruptRecord),
}

impl ChainRecord {
    /// Append position of the row.
    pub fn sequence(&self) -> i64 {
        match self {
            Self::Entry(entry) => entry.sequence,
            Self::Corrupt(record) => record.sequence,
        }
    }

    /// The decoded entry, if the row is intact.
    pub fn as_entry(&self) -> Option<&SnapshotEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Corrupt(_) => None,
        }
    }

    /// Stored chain hash, when known.
    pub fn chain_hash(&self) -> Option<ChainHash> {
        match self {
            Self::Entry(entry) => Some(entry.chain_hash),
            Self::Corrupt(record) => record.chain_hash,
        }
    }

    /// Stored predecessor, when known.
    pub fn predecessor(&self) -> Option<Predecessor> {
        match self {
            Self::Entry(entry) => Some(entry.predecessor),
            Self::Corrupt(record) => record.predecessor,
        }
    }
}
