//! Pending-input timer for search boxes.

use std::time::Duration;

use tokio::time::Instant;

/// Holds the latest input until it has been quiet for `delay`.
///
/// Each [`push`](Self::push) replaces the pending value and restarts the
/// timer; [`poll`](Self::poll) releases the value once, after the deadline.
#[derive(Debug)]
pub struct DebouncedInput<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> DebouncedInput<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Records a keystroke's worth of input received at `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// When the pending input fires, if there is one.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Takes the pending input if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.take(),
            _ => None,
        }
    }

    /// Takes the pending input regardless of its deadline.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
