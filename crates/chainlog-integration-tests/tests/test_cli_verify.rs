//! The `verify` subcommand end to end: exit status and rendered report over a
//! log whose rows were edited behind the store's back.

use chainlog_cli::verify::{render_report, run_verify, VerifyArgs};
use chainlog_core::{ContentHasher, LinkTimestamp, NewSnapshot, Tags};
use chainlog_store::ArchiveLog;

async fn seeded(n: u8) -> ArchiveLog {
    let log = ArchiveLog::open_in_memory().await.unwrap();
    for i in 0..n {
        log.append_at(
            NewSnapshot {
                source_path: format!("/cli/{i}"),
                content_digest: ContentHasher::new().digest_bytes(&[i]),
                size_bytes: 1,
                tags: Tags::empty(),
            },
            LinkTimestamp::from_nanos(1_000 * (i64::from(i) + 1)),
            i64::from(i) + 1,
        )
        .await
        .unwrap();
    }
    log
}

#[tokio::test]
async fn untouched_log_exits_zero_with_ok_report() {
    let log = seeded(3).await;
    let code = run_verify(&VerifyArgs { json: false }, &log).await.unwrap();
    assert_eq!(code, 0);

    let rendered = render_report(&log.verify().await.unwrap());
    assert_eq!(rendered, "OK: chain integrity valid (3 entries)\n");
}

#[tokio::test]
async fn non_hex_predecessor_fails_verification_with_a_report() {
    let log = seeded(3).await;
    sqlx::query("UPDATE snapshots SET predecessor = 'tampered' WHERE sequence = 2")
        .execute(log.pool())
        .await
        .unwrap();

    assert_eq!(run_verify(&VerifyArgs { json: false }, &log).await.unwrap(), 1);
    assert_eq!(run_verify(&VerifyArgs { json: true }, &log).await.unwrap(), 1);

    let rendered = render_report(&log.verify().await.unwrap());
    assert!(rendered.starts_with("FAIL: 1 discrepancies in 3 entries, first at entry 2\n"));
    assert!(rendered.contains("  - corrupt row at entry 2: predecessor: "));
}

#[tokio::test]
async fn rewritten_digest_reports_hash_mismatch_at_its_row() {
    let log = seeded(4).await;
    sqlx::query("UPDATE snapshots SET content_digest = ?1 WHERE sequence = 3")
        .bind("e".repeat(64))
        .execute(log.pool())
        .await
        .unwrap();

    assert_eq!(run_verify(&VerifyArgs { json: false }, &log).await.unwrap(), 1);
    let rendered = render_report(&log.verify().await.unwrap());
    assert!(rendered.contains("first at entry 3"), "{rendered}");
}
