//! Periodic cycle clock and the time types it is configured with.
//!
//! - [`CycleClock`]: worker thread ticking at absolute deadlines.
//! - [`ClockConfig`]: validated period (count + [`TimeUnit`]).
//! - [`Epoch`]: process-wide reference instant for program-relative time.

mod config;
mod cycle;
mod epoch;
mod time;

pub use config::{ClockConfig, ConfigError, MAX_PERIOD};
pub use cycle::CycleClock;
pub use epoch::Epoch;
pub use time::{MILLIS_PRECISION_FLOOR, TimeUnit};
