//! Periodic notifier backed by one sleeping worker thread.
//!
//! The worker sleeps to absolute deadlines `start + period * n`, so
//! scheduling jitter on one tick never shifts the next. After each tick it
//! bumps the cycle count and wakes every waiter; waiters decide for
//! themselves whether their target has been reached.
//!
//! If the worker is held up for longer than a period it catches up with
//! back-to-back ticks. Waiters see that as overshoot.

use std::sync::Arc;
use std::time::Duration;

use minstant::Instant;

use super::{ClockConfig, ConfigError, Epoch};
use crate::sync::{Lifecycle, LifecycleError, StopMode, WorkerState};
use crate::trace::{debug, trace, warn};

const DEFAULT_THREAD_NAME: &str = "lockstep-clock";

/// State shared between the tick worker and waiters.
struct Ticks {
    period: Duration,
    cycles: u64,
    started: Instant,
    next_wake: Instant,
}

impl Ticks {
    fn new(period: Duration) -> Self {
        let now = Instant::now();
        Self {
            period,
            cycles: 0,
            started: now,
            next_wake: now + period,
        }
    }
}

impl WorkerState for Ticks {
    fn on_start(&mut self) -> Result<(), LifecycleError> {
        *self = Self::new(self.period);
        Ok(())
    }

    fn on_exit(&mut self) {
        debug!(cycles = self.cycles, "clock stopped");
    }
}

/// A clock that releases waiting threads once per period.
///
/// # Example
///
/// ```
/// use lockstep::{ClockConfig, CycleClock};
///
/// let clock = CycleClock::new(ClockConfig::millis(10))?;
/// for _ in 0..3 {
///     clock.wait();
/// }
/// assert!(clock.elapsed() >= 3);
/// # Ok::<(), lockstep::ConfigError>(())
/// ```
pub struct CycleClock {
    core: Arc<Lifecycle<Ticks>>,
    config: ClockConfig,
    period: Duration,
    epoch: Epoch,
}

impl CycleClock {
    /// Builds a stopped clock measured against the process [`Epoch`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` describes an unusable period.
    pub fn new(config: ClockConfig) -> Result<Self, ConfigError> {
        Self::with_epoch(config, Epoch::process())
    }

    /// Builds a stopped clock measured against `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` describes an unusable period.
    pub fn with_epoch(config: ClockConfig, epoch: Epoch) -> Result<Self, ConfigError> {
        let period = config.validate()?;
        Ok(Self {
            core: Arc::new(Lifecycle::new(DEFAULT_THREAD_NAME, Ticks::new(period))),
            config,
            period,
            epoch,
        })
    }

    /// Names the worker thread. Only takes effect before the first start.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.rename(name);
        }
        self
    }

    /// Starts ticking from cycle 0.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyRunning`] if the worker is alive, or
    /// [`LifecycleError::Spawn`] if the thread could not be created.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.core.start(tick_loop)?;
        debug!(period = ?self.period, "clock started");
        Ok(())
    }

    /// Asks the worker to exit after its current sleep. Does not block.
    pub fn stop(&self) {
        self.core.request_stop(StopMode::Abandon);
    }

    /// Blocks until the worker has exited. Returns at once if none exists.
    pub fn join(&self) {
        self.core.join();
    }

    /// Stops the worker and waits for it.
    pub fn force_join(&self) {
        self.core.force_join();
    }

    /// Whether a worker thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Blocks until at least `target` cycles have elapsed.
    ///
    /// Starts the clock first if it is not running, or restarts it from
    /// cycle 0 if it was stopped. Returns the overshoot,
    /// `elapsed() - target`, at the moment of return.
    pub fn wait_until(&self, target: u64) -> u64 {
        self.ensure_started();
        let monitor = self.core.monitor();
        let ticks = monitor.wait_while(monitor.lock(), |ticks| ticks.cycles < target);
        ticks.cycles - target
    }

    /// Blocks for exactly one more tick; returns the overshoot.
    pub fn wait(&self) -> u64 {
        self.wait_cycles(1)
    }

    /// Blocks for `count` more ticks; returns the overshoot.
    pub fn wait_cycles(&self, count: u64) -> u64 {
        self.ensure_started();
        let monitor = self.core.monitor();
        let guard = monitor.lock();
        let target = guard.cycles.saturating_add(count);
        let ticks = monitor.wait_while(guard, |ticks| ticks.cycles < target);
        ticks.cycles - target
    }

    /// Waits up to `count` ticks, consulting `proceed` before each one.
    ///
    /// Returns `None` as soon as `proceed` returns `false`, otherwise the
    /// overshoot once `count` ticks have passed.
    pub fn wait_for(&self, count: u64, mut proceed: impl FnMut() -> bool) -> Option<u64> {
        self.ensure_started();
        let target = self.elapsed().saturating_add(count);
        loop {
            let now = self.elapsed();
            if now >= target {
                return Some(now - target);
            }
            if !proceed() {
                trace!(target, reached = now, "cycle wait cancelled");
                return None;
            }
            self.wait();
        }
    }

    /// Completed cycles since the worker (re)started.
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.core.monitor().lock().cycles
    }

    /// Completed cycles expressed as time: `elapsed() * period`.
    #[must_use]
    pub fn elapsed_time(&self) -> Duration {
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let nanos = self
            .period
            .as_nanos()
            .saturating_mul(u128::from(self.elapsed()));
        let subsec = u32::try_from(nanos % NANOS_PER_SEC).unwrap_or_default();
        u64::try_from(nanos / NANOS_PER_SEC)
            .map_or(Duration::MAX, |secs| Duration::new(secs, subsec))
    }

    /// Wall time since the worker last started, or zero if it never did.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        if !self.is_running() {
            return Duration::ZERO;
        }
        let started = self.core.monitor().lock().started;
        Instant::now()
            .checked_duration_since(started)
            .unwrap_or_default()
    }

    /// Whole clock units elapsed since the epoch.
    #[must_use]
    pub fn program_elapsed(&self) -> u128 {
        self.epoch.elapsed_in(self.config.unit)
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> ClockConfig {
        self.config
    }

    /// Length of one cycle.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// The epoch this clock measures program time against.
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn ensure_started(&self) {
        // A stopped worker may still be winding down; it never ticks again.
        if self.core.stop_mode().is_some() {
            self.core.join();
        }
        if !self.is_running() {
            // Losing a start race to another waiter is fine.
            let _ = self.start();
        }
    }
}

impl Drop for CycleClock {
    fn drop(&mut self) {
        self.core.force_join();
    }
}

impl std::fmt::Debug for CycleClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleClock")
            .field("name", &self.core.name())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Worker body: sleep to the next deadline, tick, repeat until stopped.
fn tick_loop(core: &Lifecycle<Ticks>) {
    let monitor = core.monitor();
    let mut ticks = monitor.lock();

    while core.stop_mode().is_none() {
        let now = Instant::now();
        if let Some(remaining) = ticks.next_wake.checked_duration_since(now)
            && !remaining.is_zero()
        {
            // Woken early by a stop request or spuriously; the loop re-checks.
            ticks = monitor.wait_timeout(ticks, remaining);
            continue;
        }

        ticks.cycles += 1;
        ticks.next_wake = ticks.next_wake + ticks.period;
        trace!(cycle = ticks.cycles, "tick");
        if ticks.next_wake <= now {
            warn!(cycle = ticks.cycles, "clock fell behind; catching up");
        }
        drop(ticks);

        monitor.notify_all();
        ticks = monitor.lock();
    }
}
