//! # Archive Subcommand
//!
//! Hashes a file and appends it to the log. Either the entry is durably
//! stored or nothing is.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use chainlog_core::{SnapshotEntry, Tags};
use chainlog_store::ArchiveLog;

use crate::short_hex;

/// Arguments for the `chainlog archive` subcommand.
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// File to archive.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Comma-delimited tags (e.g. "finance,q3").
    #[arg(value_name = "TAGS")]
    pub tags: Option<String>,

    /// Print the stored entry as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the archive subcommand.
pub async fn run_archive(args: &ArchiveArgs, log: &ArchiveLog) -> Result<u8> {
    let tags = args.tags.as_deref().map(Tags::parse).unwrap_or_default();
    let entry = log
        .archive_file(&args.path, tags)
        .await
        .with_context(|| format!("failed to archive {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("{}", render_archived(&entry));
    }
    Ok(0)
}

fn render_archived(entry: &SnapshotEntry) -> String {
    format!(
        "OK: archived {} (sha256={}, {} bytes)",
        entry.identity,
        short_hex(&entry.content_digest.to_hex()),
        entry.size_bytes
    )
}
