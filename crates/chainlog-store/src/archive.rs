//! # Archive Log
//!
//! The durable, ordered store of snapshot entries, backed by SQLite via
//! SQLx. All functions operate on the `snapshots` table.
//!
//! ## Append Protocol
//!
//! Reading the tail, linking, and inserting happen in one transaction while
//! the in-process append lock is held. A second process racing on the same
//! tail cannot commit a fork: SQLite refuses its write once the first
//! writer has committed, and the caller sees a database error.
//!
//! ## Mutability
//!
//! Hash-bearing columns are written once by the append path. The only
//! update paths are [`ArchiveLog::update_pin_locator`] and
//! [`ArchiveLog::update_tags`]. There is no delete.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chainlog_core::temporal::unix_seconds_now;
use chainlog_core::{
    link, verify_records, ChainHash, ChainRecord, ContentDigest, ContentHasher, CorruptRecord,
    Identity, LinkTimestamp, NewSnapshot, PinLocator, Predecessor, SnapshotEntry, Tags,
    VerificationReport,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::error::StoreError;

// Every column but the rowid is read as TEXT so a retyped value still
// reaches the decoder instead of failing inside the driver.
const SELECT_COLUMNS: &str = "SELECT sequence, \
     CAST(identity AS TEXT) AS identity, CAST(source_path AS TEXT) AS source_path, \
     CAST(content_digest AS TEXT) AS content_digest, CAST(chain_hash AS TEXT) AS chain_hash, \
     CAST(predecessor AS TEXT) AS predecessor, CAST(size_bytes AS TEXT) AS size_bytes, \
     CAST(archived_at AS TEXT) AS archived_at, \
     CAST(link_timestamp_nanos AS TEXT) AS link_timestamp_nanos, \
     CAST(pin_locator AS TEXT) AS pin_locator, CAST(tags AS TEXT) AS tags FROM snapshots";

/// Direction of an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Archival order, first append first.
    #[default]
    OldestFirst,
    /// Reverse archival order.
    NewestFirst,
}

impl Order {
    fn sql(&self) -> &'static str {
        match self {
            Self::OldestFirst => "ASC",
            Self::NewestFirst => "DESC",
        }
    }
}

/// Handle to an archive database.
///
/// Cloning is cheap and clones share the pool and the append lock.
#[derive(Debug, Clone)]
pub struct ArchiveLog {
    pool: SqlitePool,
    append_lock: Arc<Mutex<()>>,
}

impl ArchiveLog {
    /// Open (creating if needed) the database described by `config` and
    /// apply embedded migrations.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path().parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(config.db_path())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.busy_timeout)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %config.db_path().display(), "opened archive database");
        Self::migrate(pool).await
    }

    /// Open a private in-memory database. Contents vanish with the handle.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // One connection that never expires: each in-memory connection is a
        // separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    /// The underlying pool, for administrative access outside the core API.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Append an entry linked to the current tail, timestamped now.
    ///
    /// The link timestamp is forced strictly past the tail's so that a
    /// coarse or stepped-back clock never reuses an instant.
    pub async fn append(&self, new: NewSnapshot) -> Result<SnapshotEntry, StoreError> {
        self.append_inner(new, None).await
    }

    /// Append with an explicit link timestamp and archival time.
    pub async fn append_at(
        &self,
        new: NewSnapshot,
        link_timestamp: LinkTimestamp,
        archived_at_seconds: i64,
    ) -> Result<SnapshotEntry, StoreError> {
        self.append_inner(new, Some((link_timestamp, archived_at_seconds)))
            .await
    }

    async fn append_inner(
        &self,
        new: NewSnapshot,
        at: Option<(LinkTimestamp, i64)>,
    ) -> Result<SnapshotEntry, StoreError> {
        let size_bytes =
            i64::try_from(new.size_bytes).map_err(|_| StoreError::SizeOverflow(new.size_bytes))?;

        let _guard = self.append_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let tail: Option<(i64, String, Option<i64>)> = sqlx::query_as(
            "SELECT sequence, chain_hash, link_timestamp_nanos FROM snapshots
             ORDER BY sequence DESC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let (predecessor, tail_timestamp) = match tail {
            None => (Predecessor::Genesis, None),
            Some((sequence, hash, ts)) => {
                let hash = ChainHash::from_hex(&hash).map_err(|e| StoreError::CorruptRow {
                    sequence,
                    reason: format!("tail chain hash: {e}"),
                })?;
                (Predecessor::Entry(hash), ts.map(LinkTimestamp::from_nanos))
            }
        };

        let (link_timestamp, archived_at_seconds) = match at {
            Some(explicit) => explicit,
            None => {
                let mut ts = LinkTimestamp::now();
                if let Some(tail_ts) = tail_timestamp.filter(|t| ts <= *t) {
                    ts = tail_ts
                        .successor()
                        .ok_or(StoreError::TimestampExhausted { tail: tail_ts })?;
                }
                (ts, unix_seconds_now())
            }
        };

        let chain_hash = link(&predecessor, &new.content_digest, link_timestamp);
        let identity = chain_hash.identity();

        let inserted = sqlx::query(
            "INSERT INTO snapshots (identity, source_path, content_digest, chain_hash, predecessor,
             size_bytes, archived_at, link_timestamp_nanos, pin_locator, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
        )
        .bind(identity.as_str())
        .bind(&new.source_path)
        .bind(new.content_digest.to_hex())
        .bind(chain_hash.to_hex())
        .bind(predecessor.to_string())
        .bind(size_bytes)
        .bind(archived_at_seconds)
        .bind(link_timestamp.as_nanos())
        .bind(new.tags.to_string())
        .execute(&mut *tx)
        .await;

        let sequence = match inserted {
            Ok(result) => result.last_insert_rowid(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::warn!(identity = %identity, "snapshot identity collision");
                return Err(StoreError::DuplicateIdentity { identity });
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        tracing::info!(
            identity = %identity,
            sequence,
            digest = %new.content_digest,
            predecessor = %predecessor,
            "archived snapshot"
        );

        Ok(SnapshotEntry {
            sequence,
            identity,
            source_path: new.source_path,
            content_digest: new.content_digest,
            chain_hash,
            predecessor,
            size_bytes: new.size_bytes,
            archived_at_seconds,
            link_timestamp: Some(link_timestamp),
            pin_locator: None,
            tags: new.tags,
        })
    }

    /// Hash the file at `path` and append it.
    ///
    /// The path is resolved to an absolute one first. Nothing is stored if
    /// the file cannot be fully read.
    pub async fn archive_file(&self, path: &Path, tags: Tags) -> Result<SnapshotEntry, StoreError> {
        self.archive_file_with(&ContentHasher::new(), path, tags)
            .await
    }

    /// [`archive_file`](Self::archive_file) with a caller-configured hasher,
    /// e.g. one carrying a cancellation flag.
    pub async fn archive_file_with(
        &self,
        hasher: &ContentHasher,
        path: &Path,
        tags: Tags,
    ) -> Result<SnapshotEntry, StoreError> {
        let resolved = tokio::fs::canonicalize(path).await?;
        let hasher = hasher.clone();
        let to_hash = resolved.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.digest_file(&to_hash))
            .await
            .map_err(std::io::Error::other)??;

        tracing::debug!(
            path = %resolved.display(),
            size_bytes = hashed.size_bytes,
            "hashed file"
        );

        self.append(NewSnapshot {
            source_path: resolved.display().to_string(),
            content_digest: hashed.digest,
            size_bytes: hashed.size_bytes,
            tags,
        })
        .await
    }

    /// Look up an entry by identity.
    pub async fn get(&self, identity: &Identity) -> Result<SnapshotEntry, StoreError> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!("{SELECT_COLUMNS} WHERE identity = ?1"))
            .bind(identity.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.into_entry(),
            None => Err(StoreError::NotFound {
                identity: identity.clone(),
            }),
        }
    }

    /// Point-in-time listing in archival order, optionally capped.
    pub async fn list_ordered(
        &self,
        order: Order,
        limit: Option<u32>,
    ) -> Result<Vec<SnapshotEntry>, StoreError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY sequence {} LIMIT ?1",
            order.sql()
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SnapshotRow::into_entry).collect()
    }

    /// Listing that never fails on a malformed row.
    ///
    /// Rows that do not decode come back as [`ChainRecord::Corrupt`] with
    /// whatever link fields still parse, so verification and inspection can
    /// keep going past them.
    pub async fn list_records(
        &self,
        order: Order,
        limit: Option<u32>,
    ) -> Result<Vec<ChainRecord>, StoreError> {
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY sequence {} LIMIT ?1",
            order.sql()
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SnapshotRow::into_record).collect())
    }

    /// The most recently appended entry.
    pub async fn tail(&self) -> Result<Option<SnapshotEntry>, StoreError> {
        Ok(self
            .list_ordered(Order::NewestFirst, Some(1))
            .await?
            .into_iter()
            .next())
    }

    /// Number of entries.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Attach or replace the external pin locator of an entry.
    pub async fn update_pin_locator(
        &self,
        identity: &Identity,
        locator: &PinLocator,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE snapshots SET pin_locator = ?1 WHERE identity = ?2")
            .bind(locator.as_str())
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                identity: identity.clone(),
            });
        }
        tracing::info!(identity = %identity, locator = %locator, "attached pin locator");
        Ok(())
    }

    /// Replace the tags of an entry.
    pub async fn update_tags(&self, identity: &Identity, tags: &Tags) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE snapshots SET tags = ?1 WHERE identity = ?2")
            .bind(tags.to_string())
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                identity: identity.clone(),
            });
        }
        tracing::info!(identity = %identity, tags = %tags, "updated tags");
        Ok(())
    }

    /// Verify the whole log against one consistent snapshot.
    pub async fn verify(&self) -> Result<VerificationReport, StoreError> {
        let records = self.list_records(Order::OldestFirst, None).await?;
        let report = verify_records(&records);

        if report.is_valid() {
            tracing::info!(entries = report.entries_checked, "chain verified");
        } else {
            tracing::warn!(
                entries = report.entries_checked,
                discrepancies = report.discrepancies.len(),
                first_divergence = ?report.first_divergence(),
                "chain integrity violations found"
            );
        }
        Ok(report)
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SnapshotRow {
    sequence: i64,
    identity: Option<String>,
    source_path: Option<String>,
    content_digest: Option<String>,
    chain_hash: Option<String>,
    predecessor: Option<String>,
    size_bytes: Option<String>,
    archived_at: Option<String>,
    link_timestamp_nanos: Option<String>,
    pin_locator: Option<String>,
    tags: Option<String>,
}

fn required(value: &Option<String>) -> Result<&str, String> {
    value.as_deref().ok_or_else(|| "missing value".to_string())
}

fn integer(value: &Option<String>) -> Result<i64, String> {
    required(value)?.trim().parse::<i64>().map_err(|e| e.to_string())
}

impl SnapshotRow {
    fn decode(self) -> Result<SnapshotEntry, CorruptRecord> {
        let sequence = self.sequence;
        let identity = required(&self.identity)
            .and_then(|v| Identity::parse(v).map_err(|e| e.to_string()));
        let chain_hash = required(&self.chain_hash)
            .and_then(|v| ChainHash::from_hex(v).map_err(|e| e.to_string()));
        let predecessor = required(&self.predecessor)
            .and_then(|v| Predecessor::parse(v).map_err(|e| e.to_string()));

        let corrupt = |field: &str, reason: String| CorruptRecord {
            sequence,
            identity: identity.as_ref().ok().cloned(),
            predecessor: predecessor.as_ref().ok().cloned(),
            chain_hash: chain_hash.as_ref().ok().cloned(),
            field: field.to_string(),
            reason,
        };

        let identity_value = identity.clone().map_err(|e| corrupt("identity", e))?;
        let content_digest = required(&self.content_digest)
            .and_then(|v| ContentDigest::from_hex(v).map_err(|e| e.to_string()))
            .map_err(|e| corrupt("content_digest", e))?;
        let chain_hash_value = chain_hash.clone().map_err(|e| corrupt("chain_hash", e))?;
        let predecessor_value = predecessor.clone().map_err(|e| corrupt("predecessor", e))?;
        let size_bytes = integer(&self.size_bytes)
            .and_then(|n| u64::try_from(n).map_err(|e| e.to_string()))
            .map_err(|e| corrupt("size_bytes", e))?;
        let archived_at_seconds =
            integer(&self.archived_at).map_err(|e| corrupt("archived_at", e))?;
        let link_timestamp = match &self.link_timestamp_nanos {
            Some(_) => Some(LinkTimestamp::from_nanos(
                integer(&self.link_timestamp_nanos)
                    .map_err(|e| corrupt("link_timestamp_nanos", e))?,
            )),
            None => None,
        };
        let pin_locator = self
            .pin_locator
            .clone()
            .map(PinLocator::new)
            .transpose()
            .map_err(|e| corrupt("pin_locator", e.to_string()))?;
        let source_path = required(&self.source_path)
            .map_err(|e| corrupt("source_path", e))?
            .to_string();

        Ok(SnapshotEntry {
            sequence,
            identity: identity_value,
            source_path,
            content_digest,
            chain_hash: chain_hash_value,
            predecessor: predecessor_value,
            size_bytes,
            archived_at_seconds,
            link_timestamp,
            pin_locator,
            tags: Tags::parse(self.tags.as_deref().unwrap_or_default()),
        })
    }

    fn into_entry(self) -> Result<SnapshotEntry, StoreError> {
        self.decode().map_err(|c| StoreError::CorruptRow {
            sequence: c.sequence,
            reason: format!("{}: {}", c.field, c.reason),
        })
    }

    fn into_record(self) -> ChainRecord {
        match self.decode() {
            Ok(entry) => ChainRecord::Entry(entry),
            Err(corrupt) => ChainRecord::Corrupt(corrupt),
        }
    }
}
