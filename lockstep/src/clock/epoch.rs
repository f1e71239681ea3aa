//! Process-wide reference instant.
use std::sync::OnceLock;
use std::time::Duration;

use minstant::Instant;

use super::TimeUnit;

static PROCESS: OnceLock<Epoch> = OnceLock::new();

/// Fixed reference instant clocks measure program-relative time against.
///
/// [`Epoch::process`] is captured once, on first use, and never changes.
/// Clocks take their epoch at construction, so tests can inject their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub struct Epoch(Instant);

impl Epoch {
    /// The process epoch, initialized on first call.
    #[must_use]
    pub fn process() -> Self {
        *PROCESS.get_or_init(Self::now)
    }

    /// An epoch anchored at the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// The underlying monotonic instant.
    #[must_use]
    pub const fn instant(self) -> Instant {
        self.0
    }

    /// Time elapsed since the epoch.
    #[must_use]
    pub fn elapsed(self) -> Duration {
        Instant::now()
            .checked_duration_since(self.0)
            .unwrap_or_default()
    }

    /// Whole `unit`s elapsed since the epoch.
    #[must_use]
    pub fn elapsed_in(self, unit: TimeUnit) -> u128 {
        unit.count(self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn process_epoch_is_stable() {
        let first = Epoch::process();
        thread::sleep(Duration::from_millis(2));
        assert_eq!(first, Epoch::process());
        assert_eq!(first, thread::spawn(Epoch::process).join().unwrap());
    }

    #[test]
    fn elapsed_grows() {
        let epoch = Epoch::now();
        thread::sleep(Duration::from_millis(30));
        assert!(epoch.elapsed_in(TimeUnit::Milliseconds) >= 15);
        assert!(epoch.elapsed_in(TimeUnit::Microseconds) >= 15_000);
        assert_eq!(epoch.elapsed_in(TimeUnit::Hours), 0);
    }

    #[test]
    fn later_epoch_orders_after() {
        let early = Epoch::now();
        thread::sleep(Duration::from_millis(20));
        assert!(Epoch::now() > early);
    }
}
