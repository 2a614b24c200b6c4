//! # Error Types
//!
//! Errors raised by the pure building blocks of the archive log. Integrity
//! findings are not errors: verification reports them as data in a
//! [`VerificationReport`](crate::verify::VerificationReport).

use thiserror::Error;

/// Errors from digest parsing, identity validation, and content hashing.
#[derive(Error, Debug)]
pub enum ChainError {
    /// A hex-encoded 32-byte digest could not be parsed.
    #[error("invalid {kind}: {reason}")]
    InvalidDigest {
        /// Which value was being parsed ("content digest", "chain hash").
        kind: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// An identity string is not a 16-character lowercase hex prefix.
    #[error("invalid identity {0:?}: expected 16 lowercase hex characters")]
    InvalidIdentity(String),

    /// A pin locator was empty or contained whitespace only.
    #[error("pin locator must not be empty")]
    EmptyPinLocator,

    /// The content stream could not be fully read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
