//! Start/stop/join bookkeeping for a primitive that owns one worker thread.
//!
//! A [`Lifecycle`] pairs the worker's guarded state with:
//! - a stop signal that only escalates (`Drain` → `Abandon`),
//! - a running flag cleared by the worker itself on the way out,
//! - the join handle, whose lock serializes `start` against `join`.
//!
//! At most one worker is alive per lifecycle: `start` refuses while a handle
//! is held for a live thread, and `join` keeps the handle slot locked until
//! the old thread is gone.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::sync::Monitor;
use crate::trace::{debug, error, info, warn};

/// Why a worker could not be started (or reconfigured).
///
/// These are expected races in concurrent code, not bugs: every variant
/// leaves the primitive exactly as it was.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A worker thread is already alive for this instance.
    #[error("worker thread is already running")]
    AlreadyRunning,
    /// A task queue was started without a processor.
    #[error("no processor installed")]
    MissingProcessor,
    /// The task queue stopped permanently after a fatal outcome.
    #[error("worker stopped permanently after a fatal outcome")]
    Terminated,
    /// The OS refused to create the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

/// Reason a worker was asked to exit.
///
/// Ordered by severity; a pending request is only ever escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub(crate) enum StopMode {
    /// Finish everything already queued, then exit.
    Drain = 1,
    /// Exit at the next check, abandoning queued work.
    Abandon = 2,
}

const STOP_CLEAR: u8 = 0;

impl StopMode {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Drain),
            2 => Some(Self::Abandon),
            _ => None,
        }
    }
}

/// Hooks a worker's guarded state exposes to its lifecycle.
///
/// Both hooks run with the monitor locked.
pub(crate) trait WorkerState: Send + 'static {
    /// Prepares the state for a fresh worker; an error vetoes the start.
    ///
    /// # Errors
    ///
    /// Whatever the primitive considers a reason not to start.
    fn on_start(&mut self) -> Result<(), LifecycleError>;

    /// Records that the worker has exited (or never got spawned).
    fn on_exit(&mut self);
}

pub(crate) struct Lifecycle<S> {
    name: String,
    monitor: Monitor<S>,
    stop: AtomicU8,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: WorkerState> Lifecycle<S> {
    pub(crate) fn new(name: impl Into<String>, state: S) -> Self {
        Self {
            name: name.into(),
            monitor: Monitor::new(state),
            stop: AtomicU8::new(STOP_CLEAR),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Changes the name future worker threads are spawned with.
    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn monitor(&self) -> &Monitor<S> {
        &self.monitor
    }

    /// Spawns `body` on a fresh worker thread.
    ///
    /// A previous worker that already exited on its own is reaped first.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyRunning`] while a worker is alive, any error
    /// from [`WorkerState::on_start`], or [`LifecycleError::Spawn`].
    pub(crate) fn start<F>(self: &Arc<Self>, body: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let mut slot = self.handle_slot();

        if let Some(finished) = slot.take_if(|handle| handle.is_finished()) {
            self.reap(finished);
        }
        if slot.is_some() {
            debug!(worker = %self.name, "start ignored; worker already running");
            return Err(LifecycleError::AlreadyRunning);
        }

        {
            let mut state = self.monitor.lock();
            state.on_start()?;
            self.stop.store(STOP_CLEAR, Ordering::Release);
            self.running.store(true, Ordering::Release);
        }

        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _exit = ExitGuard(&shared);
                info!("worker started");
                body(&shared);
            });

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(e) => {
                error!(worker = %self.name, error = %e, "failed to spawn worker thread");
                self.mark_exited();
                Err(LifecycleError::Spawn(e))
            }
        }
    }

    /// Raises the stop signal and wakes the worker. Never blocks on it.
    pub(crate) fn request_stop(&self, mode: StopMode) {
        let previous = self.stop.fetch_max(mode as u8, Ordering::AcqRel);
        if previous < mode as u8 {
            debug!(worker = %self.name, ?mode, "stop requested");
        }
        self.monitor.poke();
    }

    /// The pending stop request, if any.
    pub(crate) fn stop_mode(&self) -> Option<StopMode> {
        StopMode::from_raw(self.stop.load(Ordering::Acquire))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Blocks until the worker has exited. Returns immediately without one.
    ///
    /// Returns `true` if a worker thread was joined by this call.
    pub(crate) fn join(&self) -> bool {
        let mut slot = self.handle_slot();
        let Some(handle) = slot.take() else {
            return false;
        };

        if handle.thread().id() == thread::current().id() {
            warn!(worker = %self.name, "worker tried to join itself; ignoring");
            *slot = Some(handle);
            return false;
        }

        debug!(worker = %self.name, "waiting for worker to exit");
        self.reap(handle);
        // `slot` is held until here so no new worker can overlap the old one.
        drop(slot);
        true
    }

    /// Abandons pending work and joins.
    pub(crate) fn force_join(&self) -> bool {
        self.request_stop(StopMode::Abandon);
        self.join()
    }

    fn reap(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            error!(worker = %self.name, "worker thread panicked");
        }
    }

    fn handle_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_exited(&self) {
        {
            let mut state = self.monitor.lock();
            state.on_exit();
            self.running.store(false, Ordering::Release);
        }
        self.monitor.notify_all();
    }
}

/// Runs on every way out of the worker body, unwinding included.
struct ExitGuard<'a, S: WorkerState>(&'a Lifecycle<S>);

impl<S: WorkerState> Drop for ExitGuard<'_, S> {
    fn drop(&mut self) {
        self.0.mark_exited();
        info!("worker exiting");
    }
}
