//! Port through which the session schedules its delayed callbacks.
//!
//! The session never sleeps: it asks a [`Scheduler`] to call back later and
//! receives the callback as [`GameSession::on_timer`](super::session::GameSession::on_timer).
//! Hosts provide a real-time implementation; tests drive a [`ManualScheduler`].

use std::{
    collections::BTreeMap,
    fmt,
    time::{Duration, Instant},
};

use serde::Serialize;

/// Handle returned by [`Scheduler::schedule`], used to cancel or identify a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(u64);

impl TimerId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// The three suspension points of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// End of the face-up preview.
    PreviewExpired,
    /// One second of countdown elapsed.
    CountdownTick,
    /// Pause after the second flip is over; compare the pair.
    ResolveSelection,
}

/// Schedulable-callback port with explicit cancel handles.
pub trait Scheduler: Send {
    /// Current time on the scheduler's clock.
    fn now(&self) -> Instant;

    /// Arrange for `kind` to be delivered back after `delay`.
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId;

    /// Cancel a pending callback. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// Deterministic fake clock. Time only moves when the owner pops due timers
/// or advances it explicitly.
#[derive(Debug)]
pub struct ManualScheduler {
    origin: Instant,
    elapsed: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), TimerKind>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Fake clock at zero with nothing scheduled.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Duration::ZERO,
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Time elapsed on the fake clock since creation.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Callbacks still scheduled.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `id` is still scheduled.
    #[cfg(test)]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.keys().any(|(_, pending)| *pending == id)
    }

    /// Pop the earliest timer due at or before `until` (measured from creation),
    /// moving the clock to its deadline. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerKind)> {
        let (&(deadline, id), _) = self.pending.first_key_value()?;
        if deadline > until {
            return None;
        }
        let kind = self.pending.remove(&(deadline, id))?;
        self.elapsed = self.elapsed.max(deadline);
        Some((id, kind))
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, at: Duration) {
        self.elapsed = self.elapsed.max(at);
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.origin + self.elapsed
    }

    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((self.elapsed + delay, id), kind);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|(_, pending), _| *pending != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut scheduler = ManualScheduler::new();
        let late = scheduler.schedule(Duration::from_secs(2), TimerKind::CountdownTick);
        let early = scheduler.schedule(Duration::from_millis(300), TimerKind::ResolveSelection);

        let until = Duration::from_secs(5);
        assert_eq!(
            scheduler.pop_due(until),
            Some((early, TimerKind::ResolveSelection))
        );
        assert_eq!(scheduler.elapsed(), Duration::from_millis(300));
        assert_eq!(scheduler.pop_due(until), Some((late, TimerKind::CountdownTick)));
        assert_eq!(scheduler.pop_due(until), None);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule(Duration::from_secs(1), TimerKind::PreviewExpired);
        assert!(scheduler.is_pending(id));
        scheduler.cancel(id);
        scheduler.cancel(id);
        assert!(!scheduler.is_pending(id));
        assert_eq!(scheduler.pop_due(Duration::from_secs(10)), None);
    }

    #[test]
    fn timers_beyond_horizon_wait() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule(Duration::from_secs(3), TimerKind::CountdownTick);
        assert_eq!(scheduler.pop_due(Duration::from_secs(2)), None);
        scheduler.advance_to(Duration::from_secs(2));
        assert_eq!(scheduler.now() - scheduler.origin, Duration::from_secs(2));
        assert_eq!(scheduler.pending_count(), 1);
    }
}
