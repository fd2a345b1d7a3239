//! Nanosecond-precision receive timestamps
//!
//! Segment rows store receive time as signed 64-bit nanoseconds since the
//! Unix epoch. Inside the engine time is carried as an unsigned nanosecond
//! count so that ordering and range arithmetic never have to reason about
//! negative values.
//!
//! ## Usage
//!
//! Never expose raw arithmetic. Use explicit constructors:
//!
//! ```
//! use logstream_core::Timestamp;
//!
//! let t = Timestamp::new(10, 500);
//! assert_eq!(t.as_nanos(), 10_000_000_500);
//! assert_eq!(Timestamp::from_nanos(1_000).as_micros(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanosecond-precision timestamp
///
/// ## Invariants
///
/// - Timestamps are always non-negative (u64)
/// - Timestamps are always in nanoseconds
/// - `sec`/`nsec` views are derived, `nsec` is always below one second
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch
    pub const ZERO: Timestamp = Timestamp(0);

    /// Maximum representable timestamp
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Smallest representable step between two timestamps
    pub const TICK: Duration = Duration::from_nanos(1);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp from a seconds / nanoseconds pair
    ///
    /// `nsec` values of one second or more carry into `sec`.
    #[inline]
    pub const fn new(sec: u32, nsec: u32) -> Self {
        Timestamp((sec as u64) * NANOS_PER_SEC + nsec as u64)
    }

    /// Create a timestamp from nanoseconds since epoch
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    /// Create a timestamp from a signed segment value
    ///
    /// Negative values clamp to [`Timestamp::ZERO`]; iteration from `ZERO`
    /// still yields those rows.
    #[inline]
    pub fn from_segment_nanos(nanos: i64) -> Self {
        Timestamp(u64::try_from(nanos).unwrap_or(0))
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000_000))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Nanoseconds since epoch
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Nanoseconds as the signed representation used by segment queries
    ///
    /// Values beyond `i64::MAX` saturate.
    #[inline]
    pub fn as_segment_nanos(&self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }

    /// Microseconds since epoch (truncates)
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0 / 1_000
    }

    /// Whole seconds since epoch
    #[inline]
    pub const fn sec(&self) -> u64 {
        self.0 / NANOS_PER_SEC
    }

    /// Sub-second nanoseconds
    #[inline]
    pub const fn nsec(&self) -> u32 {
        (self.0 % NANOS_PER_SEC) as u32
    }

    // =========================================================================
    // Duration Operations
    // =========================================================================

    /// Compute duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_nanos)
    }

    /// Add a duration to this timestamp
    ///
    /// Saturates at `Timestamp::MAX` on overflow.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(nanos))
    }

    /// Subtract a duration from this timestamp
    ///
    /// Saturates at `Timestamp::ZERO` on underflow.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_sub(nanos))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::ZERO
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.sec(), self.nsec())
    }
}

impl From<u64> for Timestamp {
    /// Create from raw nanoseconds
    fn from(nanos: u64) -> Self {
        Timestamp::from_nanos(nanos)
    }
}

impl From<Timestamp> for u64 {
    /// Extract raw nanoseconds
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
