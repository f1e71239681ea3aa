//! Time units for clock periods and epoch measurements.
use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unit a clock period (or an epoch reading) is expressed in.
///
/// Every unit can measure time since the [`Epoch`](super::Epoch); only
/// milliseconds and coarser can drive a [`CycleClock`](super::CycleClock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Nanoseconds.
    Nanoseconds,
    /// Microseconds.
    Microseconds,
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
}

/// Smallest millisecond period a clock accepts.
///
/// Sleeping to sub-5ms deadlines is at the mercy of scheduler granularity.
pub const MILLIS_PRECISION_FLOOR: u64 = 5;

impl TimeUnit {
    /// Short human-readable name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
        }
    }

    /// Length of one unit in nanoseconds.
    #[must_use]
    pub const fn nanos(self) -> u128 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60_000_000_000,
            Self::Hours => 3_600_000_000_000,
        }
    }

    /// Whether a clock may tick in this unit.
    #[must_use]
    pub const fn drives_clock(self) -> bool {
        !matches!(self, Self::Nanoseconds | Self::Microseconds)
    }

    /// Smallest period a clock accepts in this unit, if any.
    #[must_use]
    pub const fn precision_floor(self) -> Option<u64> {
        match self {
            Self::Milliseconds => Some(MILLIS_PRECISION_FLOOR),
            _ => None,
        }
    }

    /// `count` of this unit as a [`Duration`], or `None` on overflow.
    #[must_use]
    pub fn duration(self, count: u64) -> Option<Duration> {
        match self {
            Self::Nanoseconds => Some(Duration::from_nanos(count)),
            Self::Microseconds => Some(Duration::from_micros(count)),
            Self::Milliseconds => Some(Duration::from_millis(count)),
            Self::Seconds => Some(Duration::from_secs(count)),
            Self::Minutes => count.checked_mul(60).map(Duration::from_secs),
            Self::Hours => count.checked_mul(3_600).map(Duration::from_secs),
        }
    }

    /// Whole units contained in `duration` (truncating).
    #[must_use]
    pub fn count(self, duration: Duration) -> u128 {
        duration.as_nanos() / self.nanos()
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
