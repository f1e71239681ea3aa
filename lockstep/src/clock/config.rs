//! Clock period configuration.
//!
//! A period is a count plus a [`TimeUnit`]. It is plain data (and
//! deserializable), so validation happens when a clock is built from it:
//! see [`ClockConfig::validate`].
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TimeUnit;

/// Longest accepted period, about nine years.
///
/// Deadlines are kept as monotonic instants; periods much longer than this
/// cannot be added to one without overflowing.
pub const MAX_PERIOD: Duration = Duration::from_nanos(1 << 58);

/// Period of a [`CycleClock`](super::CycleClock).
///
/// **Default**: 50 milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Number of `unit`s in one cycle.
    pub period: u64,
    /// Unit of `period`.
    pub unit: TimeUnit,
}

/// A period/unit combination no clock can honor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A zero period would tick continuously.
    #[error("clock period must be non-zero")]
    ZeroPeriod,
    /// Sub-millisecond units are for measurement only.
    #[error("{0} cannot drive a clock; use milliseconds or coarser")]
    UnsupportedUnit(TimeUnit),
    /// The period is finer than the unit's precision floor.
    #[error("period {period}{unit} is below the {floor}{unit} precision floor")]
    BelowPrecisionFloor {
        /// Requested period.
        period: u64,
        /// Unit of the period.
        unit: TimeUnit,
        /// Smallest accepted period in `unit`.
        floor: u64,
    },
    /// The period is longer than [`MAX_PERIOD`].
    #[error("period {period}{unit} exceeds the maximum clock period")]
    Overflow {
        /// Requested period.
        period: u64,
        /// Unit of the period.
        unit: TimeUnit,
    },
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::millis(50)
    }
}

impl ClockConfig {
    /// A period of `period` `unit`s.
    #[must_use]
    pub const fn new(period: u64, unit: TimeUnit) -> Self {
        Self { period, unit }
    }

    /// A period in milliseconds.
    #[must_use]
    pub const fn millis(period: u64) -> Self {
        Self::new(period, TimeUnit::Milliseconds)
    }

    /// A period in seconds.
    #[must_use]
    pub const fn seconds(period: u64) -> Self {
        Self::new(period, TimeUnit::Seconds)
    }

    /// A period in minutes.
    #[must_use]
    pub const fn minutes(period: u64) -> Self {
        Self::new(period, TimeUnit::Minutes)
    }

    /// A period in hours.
    #[must_use]
    pub const fn hours(period: u64) -> Self {
        Self::new(period, TimeUnit::Hours)
    }

    /// Checks the period and returns it as a [`Duration`].
    ///
    /// # Errors
    ///
    /// See [`ConfigError`]; checks run in declaration order.
    pub fn validate(&self) -> Result<Duration, ConfigError> {
        let Self { period, unit } = *self;

        if period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if !unit.drives_clock() {
            return Err(ConfigError::UnsupportedUnit(unit));
        }
        if let Some(floor) = unit.precision_floor()
            && period < floor
        {
            return Err(ConfigError::BelowPrecisionFloor {
                period,
                unit,
                floor,
            });
        }
        unit.duration(period)
            .filter(|duration| *duration <= MAX_PERIOD)
            .ok_or(ConfigError::Overflow { period, unit })
    }
}
