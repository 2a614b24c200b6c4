//! # List and Show Subcommands
//!
//! Read-only views over the log: a newest-first listing and the full record
//! of a single entry. The listing keeps going past rows that no longer
//! decode and marks them instead.

use anyhow::{Context, Result};
use clap::Args;

use chainlog_core::temporal::format_unix_seconds;
use chainlog_core::{ChainRecord, Identity, SnapshotEntry};
use chainlog_store::{ArchiveLog, Order};

use crate::short_hex;

/// Arguments for the `chainlog list` subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum number of entries to show (all when omitted).
    #[arg(value_name = "LIMIT")]
    pub limit: Option<u32>,

    /// Print entries as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `chainlog show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// 16-hex-character entry identity.
    #[arg(value_name = "IDENTITY")]
    pub identity: String,

    /// Print the entry as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the list subcommand.
pub async fn run_list(args: &ListArgs, log: &ArchiveLog) -> Result<u8> {
    let records = log.list_records(Order::NewestFirst, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("(empty archive)");
    } else {
        for record in &records {
            println!("{}", render_record(record));
        }
    }
    Ok(0)
}

/// Execute the show subcommand.
pub async fn run_show(args: &ShowArgs, log: &ArchiveLog) -> Result<u8> {
    let identity = Identity::parse(&args.identity).context("invalid identity")?;
    let entry = log.get(&identity).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        print!("{}", render_detail(&entry));
    }
    Ok(0)
}

/// One summary line per entry.
pub fn render_line(entry: &SnapshotEntry) -> String {
    let pin = entry
        .pin_locator
        .as_ref()
        .map(|p| format!(" pin={}", p.as_str()))
        .unwrap_or_default();
    let tags = if entry.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", entry.tags)
    };
    format!(
        "{}  {}  {:>10}  {}{}{}",
        entry.identity,
        format_unix_seconds(entry.archived_at_seconds),
        entry.size_bytes,
        entry.source_path,
        tags,
        pin
    )
}

/// Summary line for a listed row, readable or not.
pub fn render_record(record: &ChainRecord) -> String {
    match record {
        ChainRecord::Entry(entry) => render_line(entry),
        ChainRecord::Corrupt(corrupt) => {
            let identity = corrupt
                .identity
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("#{}", corrupt.sequence));
            format!("{identity}  CORRUPT  {}: {}", corrupt.field, corrupt.reason)
        }
    }
}

/// Every stored field of one entry, one per line.
pub fn render_detail(entry: &SnapshotEntry) -> String {
    let link_timestamp = entry
        .link_timestamp
        .map(|ts| ts.as_nanos().to_string())
        .unwrap_or_else(|| "(not retained)".to_string());
    let pin = entry
        .pin_locator
        .as_ref()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "(none)".to_string());

    let mut out = String::new();
    out.push_str(&format!("identity:       {}\n", entry.identity));
    out.push_str(&format!("sequence:       {}\n", entry.sequence));
    out.push_str(&format!("source path:    {}\n", entry.source_path));
    out.push_str(&format!("content digest: {}\n", entry.content_digest));
    out.push_str(&format!("chain hash:     {}\n", entry.chain_hash));
    out.push_str(&format!("predecessor:    {}\n", entry.predecessor));
    out.push_str(&format!("size:           {} bytes\n", entry.size_bytes));
    out.push_str(&format!(
        "archived at:    {}\n",
        format_unix_seconds(entry.archived_at_seconds)
    ));
    out.push_str(&format!("link timestamp: {link_timestamp}\n"));
    out.push_str(&format!("pin locator:    {pin}\n"));
    out.push_str(&format!("tags:           {}\n", entry.tags));
    out.push_str(&format!(
        "chain:          {} -> {}\n",
        short_hex(&entry.predecessor.to_string()),
        short_hex(&entry.chain_hash.to_hex())
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlog_core::{ContentHasher, LinkTimestamp, NewSnapshot, Tags};

    async fn seeded() -> (ArchiveLog, Vec<SnapshotEntry>) {
        let log = ArchiveLog::open_in_memory().await.unwrap();
        let mut entries = Vec::new();
        for (i, name) in ["alpha", "beta"].iter().enumerate() {
            let entry = log
                .append_at(
                    NewSnapshot {
                        source_path: format!("/data/{name}.txt"),
                        content_digest: ContentHasher::new().digest_bytes(name.as_bytes()),
                        size_bytes: 5,
                        tags: Tags::parse("q3"),
                    },
                    LinkTimestamp::from_nanos(1_700_000_000_000_000_000 + i as i64),
                    1_700_000_000,
                )
                .await
                .unwrap();
            entries.push(entry);
        }
        (log, entries)
    }

    #[test]
    fn render_line_shows_identity_time_and_tags() {
        let entry = SnapshotEntry {
            sequence: 1,
            identity: Identity::parse("0123456789abcdef").unwrap(),
            source_path: "/data/a.txt".to_string(),
            content_digest: ContentHasher::new().digest_bytes(b"a"),
            chain_hash: chainlog_core::ChainHash::from_bytes([0u8; 32]),
            predecessor: chainlog_core::Predecessor::Genesis,
            size_bytes: 42,
            archived_at_seconds: 0,
            link_timestamp: None,
            pin_locator: None,
            tags: Tags::parse("b,a"),
        };
        assert_eq!(
            render_line(&entry),
            "0123456789abcdef  1970-01-01T00:00:00Z          42  /data/a.txt [a,b]"
        );
        let detail = render_detail(&entry);
        assert!(detail.contains("link timestamp: (not retained)\n"));
        assert!(detail.contains("predecessor:    GENESIS\n"));
        assert!(detail.contains("chain:          GENESIS -> 000000000000...\n"));
    }

    #[tokio::test]
    async fn list_and_show_succeed_on_populated_log() {
        let (log, entries) = seeded().await;
        let list = ListArgs {
            limit: Some(1),
            json: false,
        };
        assert_eq!(run_list(&list, &log).await.unwrap(), 0);

        let show = ShowArgs {
            identity: entries[1].identity.as_str().to_uppercase(),
            json: true,
        };
        assert_eq!(run_show(&show, &log).await.unwrap(), 0);
        assert!(render_detail(&entries[1]).contains("tags:           q3\n"));
    }

    #[tokio::test]
    async fn list_marks_undecodable_rows_and_continues() {
        let (log, entries) = seeded().await;
        sqlx::query("UPDATE snapshots SET content_digest = 'zz' WHERE sequence = 1")
            .execute(log.pool())
            .await
            .unwrap();

        let list = ListArgs {
            limit: None,
            json: false,
        };
        assert_eq!(run_list(&list, &log).await.unwrap(), 0);

        let records = log.list_records(Order::NewestFirst, None).await.unwrap();
        assert_eq!(render_record(&records[0]), render_line(&entries[1]));
        let line = render_record(&records[1]);
        assert!(line.starts_with(&format!("{}  CORRUPT  content_digest: ", entries[0].identity)));
    }

    #[tokio::test]
    async fn show_rejects_malformed_and_unknown_identities() {
        let (log, _) = seeded().await;
        let bad = ShowArgs {
            identity: "not-hex".to_string(),
            json: false,
        };
        let err = run_show(&bad, &log).await.unwrap_err();
        assert!(err.to_string().contains("invalid identity"));

        let unknown = ShowArgs {
            identity: "ffffffffffffffff".to_string(),
            json: false,
        };
        assert!(run_show(&unknown, &log).await.is_err());
    }
}
