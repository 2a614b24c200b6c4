//! # Pin Collaborator Seam
//!
//! Remote pinning services are external to the archive log. The log only
//! ever receives a locator string back and records it through
//! [`ArchiveLog::update_pin_locator`]. A failing service never removes,
//! blocks, or alters an entry: [`pin_entry`] reports the failure as a
//! [`PinOutcome`] and leaves the entry exactly as it was.

use std::future::Future;

use chainlog_core::{Identity, PinLocator, SnapshotEntry};
use thiserror::Error;

use crate::archive::ArchiveLog;
use crate::error::StoreError;

/// Errors a pinning service may report.
#[derive(Error, Debug)]
pub enum PinError {
    /// The service could not be reached or timed out.
    #[error("pin service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request (auth, quota, payload).
    #[error("pin request rejected: {0}")]
    Rejected(String),
}

/// An external store that accepts an entry's content and returns a locator.
pub trait PinService {
    /// Pin `entry` and return its locator.
    fn pin(&self, entry: &SnapshotEntry) -> impl Future<Output = Result<PinLocator, PinError>> + Send;
}

/// Result of [`pin_entry`].
#[derive(Debug)]
pub enum PinOutcome {
    /// The locator was stored; the updated entry is attached.
    Pinned(SnapshotEntry),
    /// The service failed; the entry is unchanged.
    Failed {
        /// The entry that was not pinned.
        identity: Identity,
        /// Service error.
        error: PinError,
    },
}

/// Pin the entry with `identity` through `service` and record the locator.
///
/// Store errors (unknown identity, database failure) are returned as
/// `Err`; service failures are reported as [`PinOutcome::Failed`].
pub async fn pin_entry<P: PinService + Sync>(
    log: &ArchiveLog,
    identity: &Identity,
    service: &P,
) -> Result<PinOutcome, StoreError> {
    let entry = log.get(identity).await?;

    match service.pin(&entry).await {
        Ok(locator) => {
            log.update_pin_locator(identity, &locator).await?;
            Ok(PinOutcome::Pinned(SnapshotEntry {
                pin_locator: Some(locator),
                ..entry
            }))
        }
        Err(error) => {
            tracing::warn!(identity = %identity, error = %error, "pinning failed; entry left unpinned");
            Ok(PinOutcome::Failed {
                identity: identity.clone(),
                error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlog_core::{ContentHasher, NewSnapshot, Tags};

    struct FixedLocator(&'static str);

    impl PinService for FixedLocator {
        fn pin(
            &self,
            entry: &SnapshotEntry,
        ) -> impl Future<Output = Result<PinLocator, PinError>> + Send {
            let locator = PinLocator::new(format!("{}-{}", self.0, entry.identity))
                .map_err(|e| PinError::Rejected(e.to_string()));
            async move { locator }
        }
    }

    struct Offline;

    impl PinService for Offline {
        fn pin(
            &self,
            _entry: &SnapshotEntry,
        ) -> impl Future<Output = Result<PinLocator, PinError>> + Send {
            async { Err(PinError::Unavailable("connection refused".to_string())) }
        }
    }

    async fn log_with_entry() -> (ArchiveLog, SnapshotEntry) {
        let log = ArchiveLog::open_in_memory().await.unwrap();
        let entry = log
            .append(NewSnapshot {
                source_path: "/pinned".to_string(),
                content_digest: ContentHasher::new().digest_bytes(b"pin"),
                size_bytes: 3,
                tags: Tags::empty(),
            })
            .await
            .unwrap();
        (log, entry)
    }

    #[tokio::test]
    async fn successful_pin_records_locator() {
        let (log, entry) = log_with_entry().await;
        let outcome = pin_entry(&log, &entry.identity, &FixedLocator("bafy"))
            .await
            .unwrap();

        let PinOutcome::Pinned(pinned) = outcome else {
            panic!("expected pinned outcome");
        };
        let expected = format!("bafy-{}", entry.identity);
        assert_eq!(pinned.pin_locator.as_ref().map(PinLocator::as_str), Some(expected.as_str()));
        assert_eq!(log.get(&entry.identity).await.unwrap(), pinned);
        assert!(log.verify().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn failed_pin_leaves_entry_untouched() {
        let (log, entry) = log_with_entry().await;
        let outcome = pin_entry(&log, &entry.identity, &Offline).await.unwrap();
        assert!(matches!(outcome, PinOutcome::Failed { error: PinError::Unavailable(_), .. }));
        assert_eq!(log.get(&entry.identity).await.unwrap(), entry);
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn pin_unknown_identity_is_not_found() {
        let (log, _) = log_with_entry().await;
        let missing = Identity::parse("0123456789abcdef").unwrap();
        let err = pin_entry(&log, &missing, &Offline).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
