//! # chainlog-core: Hash-Chain Archive Primitives
//!
//! The pure building blocks of the tamper-evident archive log. Every other
//! crate in the workspace depends on `chainlog-core`; it depends on nothing
//! internal and performs no I/O beyond reading the byte streams it hashes.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ──ContentHasher──▶ ContentDigest
//!                              │
//! tail chain hash ──link(pred, digest, ts)──▶ ChainHash ──▶ Identity
//!
//! ordered entries ──verify_chain──▶ VerificationReport
//! raw row scan ──verify_records──▶ VerificationReport
//! ```
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Integrity findings are data, never errors.

pub mod digest;
pub mod entry;
pub mod error;
pub mod hasher;
pub mod link;
pub mod temporal;
pub mod verify;

// Re-export primary types for ergonomic imports.
pub use digest::{ChainHash, ContentDigest, Identity, IDENTITY_LEN};
pub use entry::{ChainRecord, CorruptRecord, NewSnapshot, PinLocator, SnapshotEntry, Tags};
pub use error::ChainError;
pub use hasher::{ContentHasher, HashedContent, DEFAULT_BLOCK_SIZE};
pub use link::{link, Predecessor, GENESIS};
pub use temporal::LinkTimestamp;
pub use verify::{
    verify_chain, verify_records, ChainIndex, ChainWalk, Confidence, Discrepancy,
    VerificationReport, WalkEnd,
};
