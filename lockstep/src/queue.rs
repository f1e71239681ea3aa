//! Single-consumer task queue.
//!
//! [`TaskQueue`] owns one worker thread that hands posted items to a
//! processor in FIFO order. The processor's [`Outcome`] decides whether the
//! worker keeps going; [`QueueState`] tracks where the queue is.

mod outcome;
mod state;
mod task_queue;

pub use outcome::Outcome;
pub use state::QueueState;
pub use task_queue::TaskQueue;
