use core::fmt;

/// Where a [`TaskQueue`](super::TaskQueue) is in its lifecycle.
///
/// ```text
/// Idle ──start──▶ Running ──stop──▶ Draining ──▶ Stopped
///                    │  └──force_join──▶ Abandoning ──▶ Stopped
///                    └──Fatal──▶ Failed
/// ```
///
/// `Stopped` queues can be started again; `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueState {
    /// Constructed, never started.
    #[default]
    Idle,
    /// Worker alive and processing or waiting for items.
    Running,
    /// Graceful stop observed; finishing the backlog.
    Draining,
    /// Forced stop observed; exiting without touching the backlog.
    Abandoning,
    /// Worker exited; may be restarted.
    Stopped,
    /// The processor reported a fatal outcome (or panicked).
    Failed,
}

impl QueueState {
    /// Whether the queue accepts a `start`.
    #[must_use]
    pub const fn can_start(self) -> bool {
        !matches!(self, Self::Failed)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Abandoning => "abandoning",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
