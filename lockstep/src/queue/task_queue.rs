//! Unbounded FIFO drained by one dedicated worker thread.
//!
//! Producers append under the instance lock and return immediately. The
//! worker pops one item at a time and runs the processor with the lock
//! released, so `post` never waits on processing.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{Outcome, QueueState};
use crate::sync::{Lifecycle, LifecycleError, StopMode, WorkerState};
use crate::trace::{debug, error, trace, warn};

const DEFAULT_THREAD_NAME: &str = "lockstep-queue";

type Processor<T> = Arc<dyn Fn(T) -> Outcome + Send + Sync>;

/// Guarded queue state: pending items, lifecycle state and the processor.
struct Backlog<T> {
    items: VecDeque<T>,
    state: QueueState,
    processor: Option<Processor<T>>,
}

/// One decision of the worker loop.
enum Step<T> {
    Process(T, Processor<T>),
    Wait,
    Exit,
}

impl<T> Backlog<T> {
    /// Picks the worker's next step from the stop request and the backlog.
    fn next_step(&mut self, stop: Option<StopMode>) -> Step<T> {
        match stop {
            Some(StopMode::Abandon) => {
                self.state = QueueState::Abandoning;
                return Step::Exit;
            }
            Some(StopMode::Drain) if self.items.is_empty() => return Step::Exit,
            Some(StopMode::Drain) => self.state = QueueState::Draining,
            None if self.items.is_empty() => return Step::Wait,
            None => {}
        }

        let Some(processor) = self.processor.clone() else {
            return Step::Exit;
        };
        match self.items.pop_front() {
            Some(item) => Step::Process(item, processor),
            None => Step::Wait,
        }
    }

    fn discard(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}

impl<T: Send + 'static> WorkerState for Backlog<T> {
    fn on_start(&mut self) -> Result<(), LifecycleError> {
        if !self.state.can_start() {
            return Err(LifecycleError::Terminated);
        }
        if self.processor.is_none() {
            return Err(LifecycleError::MissingProcessor);
        }
        self.state = QueueState::Running;
        Ok(())
    }

    fn on_exit(&mut self) {
        if self.state != QueueState::Failed {
            self.state = QueueState::Stopped;
        }
    }
}

/// A FIFO task queue with a single consumer thread.
///
/// Items can be posted from any thread at any time, including before
/// [`start`](Self::start); they are handed to the processor strictly in
/// posting order and each at most once.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lockstep::{Outcome, TaskQueue};
///
/// let queue = TaskQueue::with_processor(|line: String| {
///     println!("{line}");
///     Outcome::Continue
/// });
/// queue.post("hello".to_owned()).unwrap();
/// queue.start()?;
/// assert!(queue.safe_join(Duration::from_millis(5)));
/// # Ok::<(), lockstep::LifecycleError>(())
/// ```
pub struct TaskQueue<T: Send + 'static> {
    core: Arc<Lifecycle<Backlog<T>>>,
    updated: Arc<AtomicBool>,
}

impl<T: Send + 'static> TaskQueue<T> {
    /// An idle queue with no processor.
    #[must_use]
    pub fn new() -> Self {
        let backlog = Backlog {
            items: VecDeque::new(),
            state: QueueState::Idle,
            processor: None,
        };
        Self {
            core: Arc::new(Lifecycle::new(DEFAULT_THREAD_NAME, backlog)),
            updated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// An idle queue that will hand items to `processor`.
    #[must_use]
    pub fn with_processor<F>(processor: F) -> Self
    where
        F: Fn(T) -> Outcome + Send + Sync + 'static,
    {
        let queue = Self::new();
        queue.core.monitor().lock().processor = Some(Arc::new(processor));
        queue
    }

    /// Names the worker thread. Only takes effect before the first start.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.rename(name);
        }
        self
    }

    /// Installs or replaces the processor.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyRunning`] while a worker is alive.
    pub fn set_processor<F>(&self, processor: F) -> Result<(), LifecycleError>
    where
        F: Fn(T) -> Outcome + Send + Sync + 'static,
    {
        let mut backlog = self.core.monitor().lock();
        if self.core.is_running() {
            return Err(LifecycleError::AlreadyRunning);
        }
        backlog.processor = Some(Arc::new(processor));
        Ok(())
    }

    /// Appends `item` to the backlog and wakes the worker.
    ///
    /// # Errors
    ///
    /// Hands `item` back once the queue has [`Failed`](QueueState::Failed).
    pub fn post(&self, item: T) -> Result<(), T> {
        {
            let mut backlog = self.core.monitor().lock();
            if backlog.state == QueueState::Failed {
                return Err(item);
            }
            backlog.items.push_back(item);
            self.updated.store(true, Ordering::Release);
        }
        self.core.monitor().notify_all();
        Ok(())
    }

    /// Spawns the worker.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyRunning`], [`LifecycleError::MissingProcessor`],
    /// [`LifecycleError::Terminated`] after a fatal outcome, or
    /// [`LifecycleError::Spawn`].
    pub fn start(&self) -> Result<(), LifecycleError> {
        let updated = Arc::clone(&self.updated);
        self.core.start(move |core| drain(core, &updated))?;
        debug!(queue = %self.core.name(), pending = self.len(), "queue started");
        Ok(())
    }

    /// Asks the worker to finish the current backlog and exit. Does not block.
    pub fn stop(&self) {
        self.core.request_stop(StopMode::Drain);
    }

    /// Blocks until the backlog is empty, re-checking at least every `poll`.
    ///
    /// Returns `false` instead when no worker is alive to empty it. The
    /// worker is left running either way.
    pub fn wait_until_empty(&self, poll: Duration) -> bool {
        let monitor = self.core.monitor();
        let mut backlog = monitor.lock();
        loop {
            if backlog.items.is_empty() {
                return true;
            }
            if !self.core.is_running() {
                return false;
            }
            backlog = monitor.wait_timeout(backlog, poll);
        }
    }

    /// Processes everything posted so far, then stops and joins the worker.
    ///
    /// Returns whether the backlog was fully drained. Without a live worker
    /// this returns `false` at once and leaves the backlog for a later start.
    pub fn safe_join(&self, poll: Duration) -> bool {
        if !self.core.is_running() {
            return false;
        }
        let drained = self.wait_until_empty(poll);
        self.stop();
        self.join();
        drained
    }

    /// Blocks until the worker exits, then discards what it left behind.
    ///
    /// Without a prior [`stop`](Self::stop) this waits for a fatal outcome
    /// or a stop requested elsewhere. Returns at once, keeping the backlog,
    /// when there is no worker to join.
    pub fn join(&self) {
        if self.core.join() {
            self.discard_backlog();
        }
    }

    /// Stops the worker after its current item and discards the backlog.
    pub fn force_join(&self) {
        self.core.force_join();
        self.discard_backlog();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> QueueState {
        self.core.monitor().lock().state
    }

    /// Whether the processor reported a fatal outcome.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.state() == QueueState::Failed
    }

    /// Whether a worker thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Items waiting to be processed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.monitor().lock().items.len()
    }

    /// Whether no items are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether items were posted since the worker last took one. A hint only.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.updated.load(Ordering::Acquire)
    }

    fn discard_backlog(&self) {
        let dropped = self.core.monitor().lock().discard();
        if dropped > 0 {
            warn!(queue = %self.core.name(), dropped, "discarded unprocessed items");
        }
    }
}

impl<T: Send + 'static> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Drop for TaskQueue<T> {
    fn drop(&mut self) {
        self.force_join();
    }
}

impl<T: Send + 'static> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backlog = self.core.monitor().lock();
        f.debug_struct("TaskQueue")
            .field("name", &self.core.name())
            .field("state", &backlog.state)
            .field("pending", &backlog.items.len())
            .finish_non_exhaustive()
    }
}

/// Worker body.
fn drain<T: Send + 'static>(core: &Lifecycle<Backlog<T>>, updated: &AtomicBool) {
    let monitor = core.monitor();
    let mut backlog = monitor.lock();

    loop {
        match backlog.next_step(core.stop_mode()) {
            Step::Wait => backlog = monitor.wait(backlog),
            Step::Exit => {
                debug!(state = %backlog.state, pending = backlog.items.len(), "queue worker done");
                return;
            }
            Step::Process(item, processor) => {
                updated.store(false, Ordering::Release);
                let emptied = backlog.items.is_empty();
                drop(backlog);
                if emptied {
                    // Wakes `wait_until_empty` callers.
                    monitor.notify_all();
                }

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor(item)))
                    .unwrap_or_else(|_| {
                        error!("processor panicked");
                        Outcome::Fatal
                    });
                trace!(?outcome, "item processed");

                backlog = monitor.lock();
                if outcome.is_fatal() {
                    backlog.state = QueueState::Failed;
                    error!(abandoned = backlog.items.len(), "fatal outcome; queue failed");
                    return;
                }
            }
        }
    }
}
