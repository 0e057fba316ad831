// crates/warden-core/src/core/time.rs
// ============================================================================
// Module: Warden Time Model
// Description: Canonical timestamp representation for sessions and signals.
// Purpose: Provide deterministic, replayable time values across Warden records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Warden uses explicit unix-millisecond timestamps embedded in requests and
//! records to keep decisions deterministic. The core engines never read
//! wall-clock time directly; hosts supply timestamps via request contexts or
//! an injected [`crate::interfaces::Clock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in Warden records, as unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - Arithmetic saturates; overflow never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch origin.
    pub const EPOCH: Self = Self(0);

    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the milliseconds elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta as u64 }
    }

    /// Returns this timestamp advanced by `millis`, saturating on overflow.
    #[must_use]
    pub const fn plus_millis(self, millis: u64) -> Self {
        let add = if millis > i64::MAX as u64 { i64::MAX } else { millis as i64 };
        Self(self.0.saturating_add(add))
    }

    /// Returns the UTC hour of day (0-23) for this timestamp.
    ///
    /// Timestamps outside the representable calendar range clamp to hour 0.
    #[must_use]
    pub fn hour_of_day(self) -> u8 {
        self.to_datetime().map_or(0, |dt| dt.hour())
    }

    /// Returns the UTC day of week (0 = Sunday .. 6 = Saturday).
    ///
    /// Timestamps outside the representable calendar range clamp to day 0.
    #[must_use]
    pub fn day_of_week(self) -> u8 {
        self.to_datetime()
            .map_or(0, |dt| dt.weekday().number_days_from_sunday())
    }

    /// Converts to an [`OffsetDateTime`] when representable.
    fn to_datetime(self) -> Option<OffsetDateTime> {
        let nanos = i128::from(self.0).checked_mul(1_000_000)?;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}
