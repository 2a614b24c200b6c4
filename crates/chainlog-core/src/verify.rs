//! # Chain Verification
//!
//! Re-derives the hash chain over a full, ordered snapshot of the log and
//! reports every discrepancy found. Verification is a pure read: it never
//! mutates entries and never fails on corruption; corruption is the output.
//!
//! ## Checks
//!
//! Walking entries in archival order with `expected` starting at genesis:
//!
//! 1. **Linkage**: `entry.predecessor == expected`.
//! 2. **Recomputation**: `link(entry.predecessor, entry.content_digest,
//!    entry.link_timestamp) == entry.chain_hash`. Entries without a retained
//!    link timestamp cannot be recomputed; they are counted and the report
//!    drops to [`Confidence::LinkageOnly`].
//! 3. **Identity**: `entry.identity == entry.chain_hash.identity()`.
//! 4. **Index checks**, via a `chain_hash → position` map: predecessors naming no entry,
//!    two entries claiming the same predecessor, repeated chain hashes.
//!
//! Rows that failed to decode are reported as corrupt at their position and
//! the walk continues past them (see [`verify_records`]).
//!
//! After the walk the root census flags a non-empty log with zero or
//! several genesis-linked entries.
//!
//! Positions are 1-based archival positions.

use std::collections::HashMap;

use serde::Serialize;

use crate::digest::{ChainHash, Identity};
use crate::entry::{ChainRecord, CorruptRecord, SnapshotEntry};
use crate::link::{link, Predecessor};

/// One integrity finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// The stored predecessor is not the chain hash of the preceding entry.
    LinkageBreak {
        position: usize,
        identity: Identity,
        expected: Predecessor,
        found: Predecessor,
    },
    /// The stored chain hash differs from the recomputed one.
    HashMismatch {
        position: usize,
        identity: Identity,
        expected: ChainHash,
        found: ChainHash,
    },
    /// The stored identity is not derived from the stored chain hash.
    IdentityMismatch {
        position: usize,
        expected: Identity,
        found: Identity,
    },
    /// A non-root predecessor matches no entry in the log.
    DanglingPredecessor {
        position: usize,
        identity: Identity,
        predecessor: ChainHash,
    },
    /// Two entries claim the same predecessor.
    Fork {
        position: usize,
        identity: Identity,
        predecessor: ChainHash,
        first_claimant: usize,
    },
    /// Two entries carry the same chain hash.
    DuplicateChainHash {
        position: usize,
        identity: Identity,
        first_position: usize,
    },
    /// A stored row could not be decoded.
    CorruptRow {
        position: usize,
        field: String,
        reason: String,
    },
    /// A non-empty log has no genesis-linked entry.
    MissingRoot,
    /// More than one entry is genesis-linked.
    MultipleRoots { positions: Vec<usize> },
}

impl Discrepancy {
    /// The archival position this finding is reported at.
    ///
    /// A missing root is reported at position 1, where the root belongs.
    /// Multiple roots are reported at the first extra root.
    pub fn position(&self) -> usize {
        match self {
            Self::LinkageBreak { position, .. }
            | Self::HashMismatch { position, .. }
            | Self::IdentityMismatch { position, .. }
            | Self::DanglingPredecessor { position, .. }
            | Self::Fork { position, .. }
            | Self::DuplicateChainHash { position, .. }
            | Self::CorruptRow { position, .. } => *position,
            Self::MissingRoot => 1,
            Self::MultipleRoots { positions } => positions.get(1).copied().unwrap_or(1),
        }
    }

    /// True for [`Discrepancy::LinkageBreak`].
    pub fn is_linkage_break(&self) -> bool {
        matches!(self, Self::LinkageBreak { .. })
    }

    /// True for [`Discrepancy::HashMismatch`].
    pub fn is_hash_mismatch(&self) -> bool {
        matches!(self, Self::HashMismatch { .. })
    }
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkageBreak {
                position,
                identity,
                expected,
                found,
            } => write!(
                f,
                "linkage break at entry {position} [{identity}]: expected predecessor {expected}, found {found}"
            ),
            Self::HashMismatch {
                position,
                identity,
                expected,
                found,
            } => write!(
                f,
                "hash mismatch at entry {position} [{identity}]: recomputed {expected}, stored {found}"
            ),
            Self::IdentityMismatch {
                position,
                expected,
                found,
            } => write!(
                f,
                "identity mismatch at entry {position}: chain hash derives {expected}, stored {found}"
            ),
            Self::DanglingPredecessor {
                position,
                identity,
                predecessor,
            } => write!(
                f,
                "dangling predecessor at entry {position} [{identity}]: no entry has chain hash {predecessor}"
            ),
            Self::Fork {
                position,
                identity,
                predecessor,
                first_claimant,
            } => write!(
                f,
                "fork at entry {position} [{identity}]: predecessor {predecessor} already claimed by entry {first_claimant}"
            ),
            Self::DuplicateChainHash {
                position,
                identity,
                first_position,
            } => write!(
                f,
                "duplicate chain hash at entry {position} [{identity}]: first seen at entry {first_position}"
            ),
            Self::CorruptRow {
                position,
                field,
                reason,
            } => write!(f, "corrupt row at entry {position}: {field}: {reason}"),
            Self::MissingRoot => f.write_str("no entry links to GENESIS"),
            Self::MultipleRoots { positions } => {
                let list: Vec<String> = positions.iter().map(usize::to_string).collect();
                write!(f, "multiple GENESIS-linked entries at positions {}", list.join(", "))
            }
        }
    }
}

/// How much of the chain could actually be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Confidence {
    /// Every entry's chain hash was recomputed.
    Full,
    /// Some entries lack a link timestamp; only their linkage was checked.
    LinkageOnly { unverified: usize },
}

/// Aggregate outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Number of entries walked.
    pub entries_checked: usize,
    /// Positions of genesis-linked entries.
    pub roots: Vec<usize>,
    /// Whether chain hashes were recomputed for every entry.
    pub confidence: Confidence,
    /// All findings, ordered by position.
    pub discrepancies: Vec<Discrepancy>,
}

impl VerificationReport {
    /// True when no discrepancy was found.
    pub fn is_valid(&self) -> bool {
        self.discrepancies.is_empty()
    }

    /// Position of the earliest discrepancy.
    pub fn first_divergence(&self) -> Option<usize> {
        self.discrepancies.iter().map(Discrepancy::position).min()
    }

    /// Findings of kind [`Discrepancy::LinkageBreak`].
    pub fn linkage_breaks(&self) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(|d| d.is_linkage_break())
    }

    /// Findings of kind [`Discrepancy::HashMismatch`].
    pub fn hash_mismatches(&self) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(|d| d.is_hash_mismatch())
    }
}

/// How a backward walk from the tail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEnd {
    /// The walk reached a genesis-linked entry.
    Genesis,
    /// A predecessor named a chain hash that is not in the log.
    Gap(ChainHash),
    /// The walk revisited the entry at this position.
    Cycle(usize),
}

/// Result of [`ChainIndex::walk_back`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainWalk {
    /// Positions visited, tail first.
    pub positions: Vec<usize>,
    /// Why the walk stopped.
    pub end: WalkEnd,
}

impl ChainWalk {
    /// True when the walk reached genesis and covered every entry.
    pub fn is_complete(&self, log_len: usize) -> bool {
        self.end == WalkEnd::Genesis && self.positions.len() == log_len
    }
}

/// Constant-time `chain_hash → position` lookup over an ordered entry slice.
#[derive(Debug)]
pub struct ChainIndex<'a> {
    entries: &'a [SnapshotEntry],
    by_hash: HashMap<ChainHash, usize>,
}

impl<'a> ChainIndex<'a> {
    /// Index `entries`. When a chain hash repeats, the first position wins.
    pub fn build(entries: &'a [SnapshotEntry]) -> Self {
        let mut by_hash = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            by_hash.entry(entry.chain_hash).or_insert(i + 1);
        }
        Self { entries, by_hash }
    }

    /// Position of the entry with `hash`.
    pub fn position_of(&self, hash: &ChainHash) -> Option<usize> {
        self.by_hash.get(hash).copied()
    }

    /// The entry at a 1-based position.
    pub fn entry_at(&self, position: usize) -> Option<&'a SnapshotEntry> {
        position.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Follow predecessor links from the last entry back to genesis.
    pub fn walk_back(&self) -> ChainWalk {
        let mut positions = Vec::new();
        let mut visited = vec![false; self.entries.len()];
        let mut current = self.entries.len();

        while let Some(entry) = self.entry_at(current) {
            if visited[current - 1] {
                return ChainWalk {
                    positions,
                    end: WalkEnd::Cycle(current),
                };
            }
            visited[current - 1] = true;
            positions.push(current);

            match entry.predecessor {
                Predecessor::Genesis => break,
                Predecessor::Entry(hash) => match self.position_of(&hash) {
                    Some(next) => current = next,
                    None => {
                        return ChainWalk {
                            positions,
                            end: WalkEnd::Gap(hash),
                        }
                    }
                },
            }
        }

        // Reached a genesis-linked entry, or the log is empty.
        ChainWalk {
            positions,
            end: WalkEnd::Genesis,
        }
    }
}

/// Verify an ordered snapshot of the log.
pub fn verify_chain(entries: &[SnapshotEntry]) -> VerificationReport {
    let rows: Vec<Row<'_>> = entries.iter().map(Row::Entry).collect();
    verify_rows(&rows)
}

/// Verify an ordered raw scan in which some rows may not have decoded.
///
/// Each corrupt row is reported as [`Discrepancy::CorruptRow`] at its
/// position. Its stored predecessor and chain hash still take part in the
/// linkage and index checks when they parse; when the chain hash does not,
/// the following entry is reported as dangling.
pub fn verify_records(records: &[ChainRecord]) -> VerificationReport {
    let rows: Vec<Row<'_>> = records
        .iter()
        .map(|record| match record {
            ChainRecord::Entry(entry) => Row::Entry(entry),
            ChainRecord::Corrupt(corrupt) => Row::Corrupt(corrupt),
        })
        .collect();
    verify_rows(&rows)
}

#[derive(Clone, Copy)]
enum Row<'r> {
    Entry(&'r SnapshotEntry),
    Corrupt(&'r CorruptRecord),
}

impl Row<'_> {
    fn chain_hash(&self) -> Option<ChainHash> {
        match self {
            Self::Entry(entry) => Some(entry.chain_hash),
            Self::Corrupt(record) => record.chain_hash,
        }
    }
}

fn verify_rows(rows: &[Row<'_>]) -> VerificationReport {
    let mut by_hash: HashMap<ChainHash, usize> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if let Some(hash) = row.chain_hash() {
            by_hash.entry(hash).or_insert(i + 1);
        }
    }

    let mut discrepancies = Vec::new();
    let mut roots = Vec::new();
    let mut unverified = 0usize;
    let mut claimed: HashMap<ChainHash, usize> = HashMap::new();
    // `None` after a row whose chain hash is unreadable.
    let mut expected = Some(Predecessor::Genesis);

    for (i, row) in rows.iter().enumerate() {
        let position = i + 1;

        let entry = match row {
            Row::Entry(entry) => *entry,
            Row::Corrupt(record) => {
                discrepancies.push(Discrepancy::CorruptRow {
                    position,
                    field: record.field.clone(),
                    reason: record.reason.clone(),
                });
                match record.predecessor {
                    Some(Predecessor::Genesis) => roots.push(position),
                    Some(Predecessor::Entry(hash)) => {
                        claimed.entry(hash).or_insert(position);
                    }
                    None => {}
                }
                expected = record.chain_hash.map(Predecessor::Entry);
                continue;
            }
        };

        if let Some(expected) = expected.filter(|e| *e != entry.predecessor) {
            discrepancies.push(Discrepancy::LinkageBreak {
                position,
                identity: entry.identity.clone(),
                expected,
                found: entry.predecessor,
            });
        }

        match entry.link_timestamp {
            Some(ts) => {
                let recomputed = link(&entry.predecessor, &entry.content_digest, ts);
                if recomputed != entry.chain_hash {
                    discrepancies.push(Discrepancy::HashMismatch {
                        position,
                        identity: entry.identity.clone(),
                        expected: recomputed,
                        found: entry.chain_hash,
                    });
                }
            }
            None => unverified += 1,
        }

        let derived = entry.chain_hash.identity();
        if derived != entry.identity {
            discrepancies.push(Discrepancy::IdentityMismatch {
                position,
                expected: derived,
                found: entry.identity.clone(),
            });
        }

        if let Some(first_position) = by_hash
            .get(&entry.chain_hash)
            .copied()
            .filter(|p| *p != position)
        {
            discrepancies.push(Discrepancy::DuplicateChainHash {
                position,
                identity: entry.identity.clone(),
                first_position,
            });
        }

        match entry.predecessor {
            Predecessor::Genesis => roots.push(position),
            Predecessor::Entry(hash) => {
                if !by_hash.contains_key(&hash) {
                    discrepancies.push(Discrepancy::DanglingPredecessor {
                        position,
                        identity: entry.identity.clone(),
                        predecessor: hash,
                    });
                }
                if let Some(first_claimant) = claimed.get(&hash) {
                    discrepancies.push(Discrepancy::Fork {
                        position,
                        identity: entry.identity.clone(),
                        predecessor: hash,
                        first_claimant: *first_claimant,
                    });
                } else {
                    claimed.insert(hash, position);
                }
            }
        }

        expected = Some(Predecessor::Entry(entry.chain_hash));
    }

    if !rows.is_empty() {
        if roots.is_empty() {
            discrepancies.push(Discrepancy::MissingRoot);
        } else if roots.len() > 1 {
            discrepancies.push(Discrepancy::MultipleRoots {
                positions: roots.clone(),
            });
        }
    }
    discrepancies.sort_by_key(Discrepancy::position);

    let confidence = if unverified == 0 {
        Confidence::Full
    } else {
        Confidence::LinkageOnly { unverified }
    };

    VerificationReport {
        entries_checked: rows.len(),
        roots,
        confidence,
        discrepancies,
    }
}
