use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::model::ChangeType;

/// Quiet period used when nothing else is configured
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// What a session is currently writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Persist(ChangeType),
    Restore,
}

/// The next write a session should start
#[derive(Debug, PartialEq)]
pub enum NextWrite<R> {
    Flush(ChangeType),
    Restore(R),
}

/// Debounce timer plus the single-writer queue of a session.
///
/// Every change restarts the quiet period; when it elapses (or a flush is
/// forced) one flush is requested. At most one write is in flight. Flushes
/// requested meanwhile collapse into one, restores queue in order, and a
/// pending flush goes before pending restores so unsaved edits reach the
/// history first.
#[derive(Debug)]
pub struct ChangeBuffer<R> {
    quiet_period: Duration,
    deadline: Option<Instant>,
    flush: Option<ChangeType>,
    restores: VecDeque<R>,
    in_flight: Option<WriteKind>,
}

impl<R> ChangeBuffer<R> {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            deadline: None,
            flush: None,
            restores: VecDeque::new(),
            in_flight: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Restart the quiet period
    pub fn notify_changed(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet_period);
    }

    /// Cancel the timer and request an immediate flush
    pub fn flush_now(&mut self, change: ChangeType) {
        self.deadline = None;
        self.request_flush(change);
    }

    /// Called when the deadline passes
    pub fn quiet_period_elapsed(&mut self) {
        self.deadline = None;
        self.request_flush(ChangeType::Autosave);
    }

    /// Drop a pending autosave without flushing
    pub fn cancel_timer(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn queue_restore(&mut self, restore: R) {
        self.restores.push_back(restore);
    }

    pub fn drain_restores(&mut self) -> impl Iterator<Item = R> + '_ {
        self.restores.drain(..)
    }

    pub fn in_flight(&self) -> Option<WriteKind> {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    /// Take the next queued write if nothing is in flight, marking it as
    /// in flight. A flush that turns out to have nothing to write should be
    /// reported with `finish`.
    pub fn next_write(&mut self) -> Option<NextWrite<R>> {
        if self.in_flight.is_some() {
            return None;
        }
        if let Some(change) = self.flush.take() {
            self.in_flight = Some(WriteKind::Persist(change));
            return Some(NextWrite::Flush(change));
        }
        let restore = self.restores.pop_front()?;
        self.in_flight = Some(WriteKind::Restore);
        Some(NextWrite::Restore(restore))
    }

    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    fn request_flush(&mut self, change: ChangeType) {
        // an explicit flush outranks a pending autosave
        self.flush = match (self.flush, change) {
            (Some(ChangeType::Manual), _) => Some(ChangeType::Manual),
            (_, change) => Some(change),
        };
    }
}
