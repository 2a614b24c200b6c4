//! File archival against an on-disk database: persistence across reopen,
//! metadata updates, and the all-or-nothing append.

use std::path::Path;

use chainlog_core::{ContentHasher, Identity, PinLocator, Tags};
use chainlog_store::{ArchiveLog, Order, StoreConfig, StoreError};

fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn entries_survive_reopen_and_still_verify() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("db").join("archive.db"));

    let identities: Vec<Identity> = {
        let log = ArchiveLog::open(&config).await.unwrap();
        let mut ids = Vec::new();
        for (name, bytes) in [("a.txt", &b"hello"[..]), ("b.txt", b"world"), ("c.txt", b"")] {
            let path = write(dir.path(), name, bytes);
            ids.push(log.archive_file(&path, Tags::parse("batch")).await.unwrap().identity);
        }
        log.close().await;
        ids
    };

    let log = ArchiveLog::open(&config).await.unwrap();
    let entries = log.list_ordered(Order::OldestFirst, None).await.unwrap();
    let reopened: Vec<Identity> = entries.iter().map(|e| e.identity.clone()).collect();
    assert_eq!(reopened, identities);
    assert_eq!(entries[2].size_bytes, 0);
    assert!(entries.iter().all(|e| e.tags.contains("batch")));
    assert!(log.verify().await.unwrap().is_valid());

    // Appending after reopen continues the same chain.
    let d = write(dir.path(), "d.txt", b"more");
    let next = log.archive_file(&d, Tags::empty()).await.unwrap();
    assert_eq!(next.predecessor.chain_hash(), Some(&entries[2].chain_hash));
    assert!(log.verify().await.unwrap().is_valid());
}

#[tokio::test]
async fn archived_digest_matches_file_content() {
    let dir = tempfile::tempdir().unwrap();
    let content = vec![7u8; 3 * 1024 * 1024 + 17];
    let path = write(dir.path(), "big.bin", &content);

    let log = ArchiveLog::open_in_memory().await.unwrap();
    let entry = log.archive_file(&path, Tags::empty()).await.unwrap();

    assert_eq!(entry.content_digest, ContentHasher::new().digest_bytes(&content));
    assert_eq!(entry.size_bytes, content.len() as u64);
    assert!(Path::new(&entry.source_path).is_absolute());
}

#[tokio::test]
async fn unreadable_source_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log = ArchiveLog::open_in_memory().await.unwrap();

    let err = log
        .archive_file(&dir.path().join("missing.bin"), Tags::empty())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Io(_)), "{err:?}");

    // A directory is not archivable content either.
    assert!(log.archive_file(dir.path(), Tags::empty()).await.is_err());
    assert_eq!(log.count().await.unwrap(), 0);
}

#[tokio::test]
async fn pin_and_tag_updates_persist_without_breaking_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("archive.db"));
    let path = write(dir.path(), "a.txt", b"hello");

    let identity = {
        let log = ArchiveLog::open(&config).await.unwrap();
        let entry = log.archive_file(&path, Tags::parse("draft")).await.unwrap();
        log.update_pin_locator(&entry.identity, &PinLocator::new("bafy123").unwrap())
            .await
            .unwrap();
        log.update_tags(&entry.identity, &Tags::parse("final,q3")).await.unwrap();
        log.close().await;
        entry.identity
    };

    let log = ArchiveLog::open(&config).await.unwrap();
    let entry = log.get(&identity).await.unwrap();
    assert_eq!(entry.pin_locator.as_ref().map(PinLocator::as_str), Some("bafy123"));
    assert_eq!(entry.tags.to_string(), "final,q3");
    assert!(log.verify().await.unwrap().is_valid());
}

#[tokio::test]
async fn unknown_identity_is_not_found() {
    let log = ArchiveLog::open_in_memory().await.unwrap();
    let missing = Identity::parse("abcdefabcdefabcd").unwrap();

    assert!(matches!(log.get(&missing).await, Err(StoreError::NotFound { .. })));
    assert!(matches!(
        log.update_tags(&missing, &Tags::parse("x")).await,
        Err(StoreError::NotFound { .. })
    ));
}
