//! End-to-end behavior of `TaskQueue`: ordering, concurrent producers,
//! drain vs. abandon, and fatal outcomes.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=lockstep=debug cargo test --features tracing --test queue_lifecycle -- --nocapture
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

use lockstep::{LifecycleError, Outcome, QueueState, TaskQueue};

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(lockstep::init_tracing);
}

const POLL: Duration = Duration::from_millis(5);

fn recording<T: Send + 'static>() -> (TaskQueue<T>, Arc<Mutex<Vec<T>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let queue = TaskQueue::with_processor(move |item| {
        sink.lock().unwrap().push(item);
        Outcome::Continue
    });
    (queue, seen)
}

#[test]
fn items_are_processed_in_posting_order() {
    init_test_tracing();
    let (queue, seen) = recording();
    queue.start().unwrap();
    for n in 0..1_000u32 {
        queue.post(n).unwrap();
    }

    assert!(queue.safe_join(POLL));
    let seen = seen.lock().unwrap();
    assert_eq!(*seen, (0..1_000).collect::<Vec<_>>());
}

#[test]
fn concurrent_posts_before_start_are_each_processed_once() {
    init_test_tracing();
    let (queue, seen) = recording::<(usize, usize)>();

    thread::scope(|s| {
        for producer in 0..4 {
            let queue = &queue;
            s.spawn(move || {
                for seq in 0..250 {
                    queue.post((producer, seq)).unwrap();
                }
            });
        }
    });
    assert_eq!(queue.len(), 1_000);

    queue.start().unwrap();
    assert!(queue.safe_join(POLL));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1_000);
    // Each producer's items keep their relative order.
    for producer in 0..4 {
        let mine: Vec<_> = seen
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(mine, (0..250).collect::<Vec<_>>());
    }
}

#[test]
fn concurrent_posts_while_running() {
    init_test_tracing();
    let processed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&processed);
    let queue = TaskQueue::with_processor(move |_: usize| {
        counter.fetch_add(1, Ordering::Relaxed);
        Outcome::Continue
    });
    queue.start().unwrap();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for n in 0..250 {
                    queue.post(n).unwrap();
                }
            });
        }
    });

    assert!(queue.safe_join(POLL));
    assert_eq!(processed.load(Ordering::Relaxed), 1_000);
    assert!(queue.is_empty());
}

#[test]
fn safe_join_processes_everything_posted_before_it() {
    init_test_tracing();
    let (queue, seen) = recording();
    let queue = queue.named("slow-consumer");
    queue
        .set_processor({
            let seen = Arc::clone(&seen);
            move |n: u32| {
                thread::sleep(Duration::from_millis(1));
                seen.lock().unwrap().push(n);
                Outcome::Continue
            }
        })
        .unwrap();
    for n in 0..20 {
        queue.post(n).unwrap();
    }
    queue.start().unwrap();

    assert!(queue.safe_join(POLL));
    assert_eq!(seen.lock().unwrap().len(), 20);
    assert!(!queue.is_running());
    assert_eq!(queue.state(), QueueState::Stopped);
}

#[test]
fn fatal_outcome_stops_processing() {
    init_test_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let queue = TaskQueue::with_processor(move |n: u32| {
        if n == 2 {
            return Outcome::Fatal;
        }
        sink.lock().unwrap().push(n);
        Outcome::Continue
    });
    for n in [1, 2, 3] {
        queue.post(n).unwrap();
    }
    queue.start().unwrap();

    assert!(!queue.safe_join(POLL), "the worker died with items left");
    queue.join();
    assert_eq!(*seen.lock().unwrap(), [1]);
    assert!(queue.has_failed());
    assert_eq!(queue.post(4), Err(4));
    assert!(matches!(queue.start(), Err(LifecycleError::Terminated)));
}

#[test]
fn force_join_abandons_backlog() {
    init_test_tracing();
    let processed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&processed);
    let queue = TaskQueue::with_processor(move |_: u32| {
        thread::sleep(Duration::from_millis(20));
        counter.fetch_add(1, Ordering::Relaxed);
        Outcome::Continue
    });
    for n in 0..50 {
        queue.post(n).unwrap();
    }
    queue.start().unwrap();
    thread::sleep(Duration::from_millis(30));

    queue.force_join();
    assert!(!queue.is_running());
    assert!(queue.is_empty());
    assert!(processed.load(Ordering::Relaxed) < 50);
}

#[test]
fn start_is_idempotent() {
    init_test_tracing();
    let (queue, seen) = recording();
    queue.start().unwrap();
    for _ in 0..3 {
        assert!(matches!(queue.start(), Err(LifecycleError::AlreadyRunning)));
    }
    queue.post(7u8).unwrap();

    assert!(queue.safe_join(POLL));
    assert_eq!(*seen.lock().unwrap(), [7]);
}

#[test]
fn posts_after_stop_wait_for_restart() {
    init_test_tracing();
    let (queue, seen) = recording::<u32>();
    queue.start().unwrap();
    queue.stop();
    queue.join();

    // Posted after the worker exited: kept until a worker can process them.
    queue.post(1).unwrap();
    queue.post(2).unwrap();
    assert!(!queue.wait_until_empty(POLL));
    assert!(!queue.safe_join(POLL));
    queue.join();
    assert_eq!(queue.len(), 2);

    queue.start().unwrap();
    assert!(queue.safe_join(POLL));
    assert_eq!(*seen.lock().unwrap(), [1, 2]);
}

#[test]
fn safe_join_before_start_loses_nothing() {
    init_test_tracing();
    let (queue, seen) = recording::<u32>();
    for n in 0..3 {
        queue.post(n).unwrap();
    }
    assert!(!queue.safe_join(POLL));
    assert_eq!(queue.len(), 3);

    queue.start().unwrap();
    assert!(queue.safe_join(POLL));
    assert_eq!(*seen.lock().unwrap(), [0, 1, 2]);
}
