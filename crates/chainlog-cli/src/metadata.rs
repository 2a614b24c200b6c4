//! # Pin and Tag Subcommands
//!
//! Update the two mutable metadata fields of an entry. Neither touches the
//! hash-bearing fields, so the chain stays valid.

use anyhow::{Context, Result};
use clap::Args;

use chainlog_core::{Identity, PinLocator, Tags};
use chainlog_store::ArchiveLog;

/// Arguments for the `chainlog pin` subcommand.
#[derive(Args, Debug)]
pub struct PinArgs {
    /// 16-hex-character entry identity.
    #[arg(value_name = "IDENTITY")]
    pub identity: String,

    /// External locator (e.g. a content identifier on a pinning network).
    #[arg(value_name = "LOCATOR")]
    pub locator: String,
}

/// Arguments for the `chainlog tag` subcommand.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// 16-hex-character entry identity.
    #[arg(value_name = "IDENTITY")]
    pub identity: String,

    /// Comma-delimited replacement tags. Empty clears all tags.
    #[arg(value_name = "TAGS")]
    pub tags: String,
}

/// Execute the pin subcommand.
pub async fn run_pin(args: &PinArgs, log: &ArchiveLog) -> Result<u8> {
    let identity = Identity::parse(&args.identity).context("invalid identity")?;
    let locator = PinLocator::new(args.locator.as_str()).context("invalid pin locator")?;
    log.update_pin_locator(&identity, &locator).await?;
    println!("OK: pinned {identity} at {locator}");
    Ok(0)
}

/// Execute the tag subcommand.
pub async fn run_tag(args: &TagArgs, log: &ArchiveLog) -> Result<u8> {
    let identity = Identity::parse(&args.identity).context("invalid identity")?;
    let tags = Tags::parse(&args.tags);
    log.update_tags(&identity, &tags).await?;
    if tags.is_empty() {
        println!("OK: cleared tags on {identity}");
    } else {
        println!("OK: tagged {identity} [{tags}]");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlog_core::{ContentHasher, NewSnapshot};

    async fn one_entry() -> (ArchiveLog, Identity) {
        let log = ArchiveLog::open_in_memory().await.unwrap();
        let entry = log
            .append(NewSnapshot {
                source_path: "/data/a.txt".to_string(),
                content_digest: ContentHasher::new().digest_bytes(b"a"),
                size_bytes: 1,
                tags: Tags::parse("draft"),
            })
            .await
            .unwrap();
        (log, entry.identity)
    }

    #[tokio::test]
    async fn pin_attaches_locator_and_keeps_chain_valid() {
        let (log, identity) = one_entry().await;
        let args = PinArgs {
            identity: identity.to_string(),
            locator: "  bafybeigdyrzt  ".to_string(),
        };
        assert_eq!(run_pin(&args, &log).await.unwrap(), 0);

        let entry = log.get(&identity).await.unwrap();
        assert_eq!(entry.pin_locator.unwrap().as_str(), "bafybeigdyrzt");
        assert!(log.verify().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn pin_rejects_blank_locator() {
        let (log, identity) = one_entry().await;
        let args = PinArgs {
            identity: identity.to_string(),
            locator: "   ".to_string(),
        };
        let err = run_pin(&args, &log).await.unwrap_err();
        assert!(err.to_string().contains("invalid pin locator"));
        assert!(log.get(&identity).await.unwrap().pin_locator.is_none());
    }

    #[tokio::test]
    async fn tag_replaces_and_clears() {
        let (log, identity) = one_entry().await;
        let replace = TagArgs {
            identity: identity.to_string(),
            tags: "final, q3".to_string(),
        };
        run_tag(&replace, &log).await.unwrap();
        assert_eq!(log.get(&identity).await.unwrap().tags.to_string(), "final,q3");

        let clear = TagArgs {
            identity: identity.to_string(),
            tags: String::new(),
        };
        run_tag(&clear, &log).await.unwrap();
        assert!(log.get(&identity).await.unwrap().tags.is_empty());
    }

    #[tokio::test]
    async fn tag_unknown_identity_fails() {
        let (log, _) = one_entry().await;
        let args = TagArgs {
            identity: "0000000000000000".to_string(),
            tags: "x".to_string(),
        };
        assert!(run_tag(&args, &log).await.is_err());
    }
}
