//! Store configuration.
//!
//! Resolves the database location and connection limits. Defaults suit a
//! single operator archiving from one machine. Override via environment
//! variables or explicit construction for tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default busy timeout for SQLite lock waits.
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Default upper bound on pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Where and how to open the archive database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database file. Parent directories are created on open.
    pub db_path: PathBuf,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Pool size.
    pub max_connections: u32,
}

impl StoreConfig {
    /// Configuration for `db_path` with default limits.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CHAINLOG_DB_PATH` (default: `$HOME/.chainlog/archive.db`)
    /// - `CHAINLOG_BUSY_TIMEOUT_SECS` (default: 5)
    /// - `CHAINLOG_MAX_CONNECTIONS` (default: 4)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_path(None)
    }

    /// [`from_env`](Self::from_env), except that `db_path` (when given)
    /// takes precedence over `CHAINLOG_DB_PATH` and the default location.
    pub fn from_env_with_path(db_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let db_path = match (db_path, std::env::var_os("CHAINLOG_DB_PATH")) {
            (Some(path), _) => path,
            (None, Some(path)) if !path.is_empty() => PathBuf::from(path),
            (None, _) => default_db_path()?,
        };
        let busy_timeout_secs = env_number("CHAINLOG_BUSY_TIMEOUT_SECS", DEFAULT_BUSY_TIMEOUT_SECS)?;
        let max_connections = env_number("CHAINLOG_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidNumber(
                "CHAINLOG_MAX_CONNECTIONS".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            db_path,
            busy_timeout: Duration::from_secs(busy_timeout_secs),
            max_connections,
        })
    }

    /// Replace the database path, keeping the other settings.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// The database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn default_db_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .ok_or(ConfigError::MissingHome)?;
    Ok(PathBuf::from(home).join(".chainlog").join("archive.db"))
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CHAINLOG_DB_PATH is unset and HOME is not available")]
    MissingHome,
    #[error("invalid value for {0}: {1:?}")]
    InvalidNumber(String, String),
}
