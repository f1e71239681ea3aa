//! Thread-lifecycle primitives: a single-consumer [`TaskQueue`] and a
//! periodic [`CycleClock`].
//!
//! Both own exactly one worker thread and share the same start / stop /
//! join semantics:
//! - `start` is idempotent; a second call while the worker lives returns
//!   [`LifecycleError::AlreadyRunning`] and changes nothing.
//! - stop requests never block; `join` waits for the worker to exit.
//! - dropping either primitive force-joins its worker.
//!
//! Diagnostics go through `tracing` when the `tracing` feature is enabled;
//! see [`init_tracing`].

pub mod clock;
pub mod queue;
pub mod sync;
mod trace;

pub use clock::{ClockConfig, ConfigError, CycleClock, Epoch, TimeUnit};
pub use queue::{Outcome, QueueState, TaskQueue};
pub use sync::LifecycleError;
pub use trace::{init_tracing, init_tracing_with};
