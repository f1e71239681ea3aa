/// What a processor reports after handling one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Outcome {
    /// Keep draining the backlog.
    Continue,
    /// Stop the worker for good; the queue becomes [`Failed`](super::QueueState::Failed).
    Fatal,
}

impl Outcome {
    /// Whether this outcome ends the worker.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// `true` continues, `false` is fatal.
impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok { Self::Continue } else { Self::Fatal }
    }
}

impl<E> From<Result<(), E>> for Outcome {
    fn from(result: Result<(), E>) -> Self {
        result.is_ok().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_bool() {
        assert_eq!(Outcome::from(true), Outcome::Continue);
        assert_eq!(Outcome::from(false), Outcome::Fatal);
        assert!(Outcome::from(false).is_fatal());
    }

    #[test]
    fn converts_from_result() {
        assert_eq!(Outcome::from(Ok::<(), &str>(())), Outcome::Continue);
        assert_eq!(Outcome::from(Err::<(), _>("disk full")), Outcome::Fatal);
    }
}
