//! # chainlog-store: Durable Archive Log
//!
//! Persists snapshot entries in an ordered SQLite table and exposes the
//! archive log operations: append, lookup, ordered listing, late-bound
//! metadata updates, and whole-log verification.
//!
//! ## Ownership
//!
//! [`ArchiveLog`] owns its connection pool and append lock. There is no
//! process-wide store handle; callers open a log from a [`StoreConfig`] and
//! pass it where it is needed. Each append is one transaction.
//!
//! ## What is NOT here
//!
//! Network pinning clients. The [`PinService`] trait is the seam they plug
//! into; the log itself never depends on one succeeding.

pub mod archive;
pub mod config;
pub mod error;
pub mod pin;

pub use archive::{ArchiveLog, Order};
pub use config::{ConfigError, StoreConfig};
pub use error::StoreError;
pub use pin::{pin_entry, PinError, PinOutcome, PinService};
