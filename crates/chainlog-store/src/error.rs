//! # Store Error Types
//!
//! Errors surfaced by [`ArchiveLog`](crate::ArchiveLog). Nothing here is
//! retried internally; the caller owns the retry policy.

use chainlog_core::{ChainError, Identity, LinkTimestamp};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors from archive log operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No entry has this identity.
    #[error("no snapshot with identity {identity}")]
    NotFound {
        /// The identity that was looked up.
        identity: Identity,
    },

    /// The derived identity of a new entry already exists. Nothing was
    /// stored; the caller may retry, which links with a fresh timestamp.
    #[error("snapshot identity {identity} already exists")]
    DuplicateIdentity {
        /// The colliding identity.
        identity: Identity,
    },

    /// A stored row could not be decoded into an entry.
    #[error("corrupt snapshot row #{sequence}: {reason}")]
    CorruptRow {
        /// Append position of the row.
        sequence: i64,
        /// What failed to decode.
        reason: String,
    },

    /// The tail's link timestamp is already the last representable
    /// instant, so no later entry can be linked strictly after it.
    #[error("cannot link after tail timestamp {tail}: no later instant is representable")]
    TimestampExhausted {
        /// Link timestamp of the current tail.
        tail: LinkTimestamp,
    },

    /// Content larger than the store's signed 64-bit size column.
    #[error("content size {0} bytes exceeds the storable range")]
    SizeOverflow(u64),

    /// Content unreadable or filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Database unavailable or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid store configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid digest, identity, or locator input.
    #[error(transparent)]
    Chain(#[from] ChainError),
}
