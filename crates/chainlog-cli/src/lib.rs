//! # chainlog-cli: Command-Line Interface
//!
//! Thin wrappers around [`chainlog_store::ArchiveLog`]. No chain logic lives
//! here; each subcommand opens the log, performs one operation, and renders
//! the result.
//!
//! ## Subcommands
//!
//! - `chainlog archive <path> [tags]`: hash a file and append it.
//! - `chainlog verify`: verify the whole chain; exit 1 on any discrepancy.
//! - `chainlog list [limit]`: entries, newest first.
//! - `chainlog show <identity>`: one entry in full.
//! - `chainlog pin <identity> <locator>`: attach an external locator.
//! - `chainlog tag <identity> <tags>`: replace an entry's tags.
//!
//! ```bash
//! chainlog archive ./report.pdf finance,q3
//! chainlog list 10
//! chainlog verify --json
//! ```

pub mod archive;
pub mod inspect;
pub mod metadata;
pub mod verify;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chainlog_store::{ArchiveLog, StoreConfig};

/// Open the archive log, honoring an explicit `--db` path over the
/// environment.
pub async fn open_log(db: Option<PathBuf>) -> Result<ArchiveLog> {
    let config = StoreConfig::from_env_with_path(db).context("invalid store configuration")?;
    tracing::debug!(path = %config.db_path().display(), "opening archive log");
    ArchiveLog::open(&config)
        .await
        .with_context(|| format!("failed to open archive at {}", config.db_path().display()))
}

/// First 12 hex characters followed by an ellipsis.
pub fn short_hex(hex: &str) -> String {
    match hex.get(..12) {
        Some(prefix) if hex.len() > 12 => format!("{prefix}..."),
        _ => hex.to_string(),
    }
}
