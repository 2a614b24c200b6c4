//! # Temporal Types
//!
//! Two clocks are recorded per entry and must not be confused:
//!
//! - [`LinkTimestamp`]: Unix nanoseconds folded into the chain hash. Stored
//!   exactly so that verification can recompute the hash.
//! - `archived_at_seconds`: coarse Unix seconds for display and ordering
//!   only, see [`unix_seconds_now`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nanosecond-resolution instant folded into an entry's chain hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkTimestamp(i64);

impl LinkTimestamp {
    /// The current UTC time.
    ///
    /// Saturates at `i64::MAX` after the year 2262.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Convert a UTC datetime. Out-of-range values saturate.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_nanos_opt().unwrap_or(i64::MAX))
    }

    /// Wrap a raw nanosecond count.
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// The raw nanosecond count.
    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    /// The next representable instant, or `None` at `i64::MAX`.
    pub fn successor(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Whole seconds of this instant, rounding toward negative infinity.
    pub fn as_unix_seconds(&self) -> i64 {
        self.0.div_euclid(1_000_000_000)
    }
}

impl std::fmt::Display for LinkTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current Unix time in whole seconds.
pub fn unix_seconds_now() -> i64 {
    Utc::now().timestamp()
}

/// Render Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`, or the raw number when
/// out of chrono's range.
pub fn format_unix_seconds(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| secs.to_string())
}
