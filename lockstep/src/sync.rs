//! Thread-lifecycle plumbing shared by [`crate::queue`] and [`crate::clock`].
//!
//! - `monitor`: mutex + condition variable pair with poison recovery.
//! - `lifecycle`: idempotent start / stop / join for one worker thread.

mod lifecycle;
mod monitor;

pub use lifecycle::LifecycleError;

pub(crate) use lifecycle::{Lifecycle, StopMode, WorkerState};
pub(crate) use monitor::Monitor;
