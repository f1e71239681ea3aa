//! Mutex + condition variable pair guarding one worker's shared state.
//!
//! The condition variable only ever signals; every predicate is re-checked
//! under the mutex, so spurious wakeups are absorbed here and never reach
//! callers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::trace::warn;

/// State `S` plus the condition variable its waiters sleep on.
#[derive(Debug)]
pub(crate) struct Monitor<S> {
    state: Mutex<S>,
    cond: Condvar,
}

impl<S> Monitor<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    /// Locks the state, recovering it if a previous holder panicked.
    ///
    /// Every mutation done under this lock leaves the state consistent
    /// before any user code can run, so a poisoned guard is still valid.
    pub(crate) fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("monitor mutex poisoned; recovering inner state");
            poisoned.into_inner()
        })
    }

    /// Blocks until `condition` returns false.
    pub(crate) fn wait_while<'a>(
        &self,
        guard: MutexGuard<'a, S>,
        condition: impl FnMut(&mut S) -> bool,
    ) -> MutexGuard<'a, S> {
        self.cond
            .wait_while(guard, condition)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks for one wakeup or until `timeout` elapses, whichever is first.
    ///
    /// The caller owns the predicate loop.
    pub(crate) fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, S>,
        timeout: Duration,
    ) -> MutexGuard<'a, S> {
        match self.cond.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    /// Blocks for one wakeup. The caller owns the predicate loop.
    pub(crate) fn wait<'a>(&self, guard: MutexGuard<'a, S>) -> MutexGuard<'a, S> {
        self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Takes and releases the lock, then wakes every waiter.
    ///
    /// Pairs with flags written outside the lock: a waiter that checked the
    /// flag under the lock is either already asleep (and gets woken) or will
    /// observe the new value on its next check.
    pub(crate) fn poke(&self) {
        drop(self.lock());
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn wait_while_returns_once_predicate_clears() {
        let monitor = Arc::new(Monitor::new(0u32));
        let setter = Arc::clone(&monitor);

        let handle = thread::spawn(move || {
            for _ in 0..5 {
                *setter.lock() += 1;
                setter.notify_all();
            }
        });

        let guard = monitor.wait_while(monitor.lock(), |n| *n < 5);
        assert_eq!(*guard, 5);
        drop(guard);
        handle.join().unwrap();
    }

    #[test]
    fn poke_wakes_flag_waiter() {
        let monitor = Arc::new(Monitor::new(()));
        let flag = Arc::new(AtomicBool::new(false));

        let waiter = {
            let monitor = Arc::clone(&monitor);
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                let mut guard = monitor.lock();
                while !flag.load(Ordering::Acquire) {
                    guard = monitor.wait(guard);
                }
            })
        };

        thread::sleep(Duration::from_millis(10));
        flag.store(true, Ordering::Release);
        monitor.poke();
        waiter.join().unwrap();
    }

    #[test]
    fn wait_timeout_gives_up() {
        let monitor = Monitor::new(7u8);
        let guard = monitor.wait_timeout(monitor.lock(), Duration::from_millis(5));
        assert_eq!(*guard, 7);
    }

    #[test]
    fn lock_recovers_from_poison() {
        let monitor = Arc::new(Monitor::new(1u8));
        let poisoner = Arc::clone(&monitor);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the monitor");
        })
        .join();

        *monitor.lock() += 1;
        assert_eq!(*monitor.lock(), 2);
    }
}
