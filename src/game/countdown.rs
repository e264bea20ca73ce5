use std::time::Duration;

use super::scheduler::{Scheduler, TimerId, TimerKind};

const TICK: Duration = Duration::from_secs(1);

/// What a delivered tick meant for the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// One second elapsed, this many remain.
    Running(u32),
    /// Remaining time reached zero. Reported once; the countdown is stopped.
    Expired,
    /// The tick belongs to a run that was stopped or replaced.
    Stale,
}

/// Per-second countdown driven through a [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining: u32,
    pending: Option<TimerId>,
}

impl Countdown {
    /// Stopped countdown showing `seconds`.
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            pending: None,
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether a tick is scheduled.
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Start counting down from `seconds`, stopping any previous run first.
    pub fn start<S: Scheduler + ?Sized>(&mut self, seconds: u32, scheduler: &mut S) {
        self.stop(scheduler);
        self.remaining = seconds;
        self.pending = Some(scheduler.schedule(TICK, TimerKind::CountdownTick));
    }

    /// Cancel the pending tick, if any. Idempotent.
    pub fn stop<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    /// Stop and restore the displayed time to `seconds`.
    pub fn reset<S: Scheduler + ?Sized>(&mut self, seconds: u32, scheduler: &mut S) {
        self.stop(scheduler);
        self.remaining = seconds;
    }

    /// Handle a delivered tick.
    pub fn on_tick<S: Scheduler + ?Sized>(&mut self, id: TimerId, scheduler: &mut S) -> CountdownStep {
        if self.pending != Some(id) {
            return CountdownStep::Stale;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.pending = None;
            return CountdownStep::Expired;
        }

        self.pending = Some(scheduler.schedule(TICK, TimerKind::CountdownTick));
        CountdownStep::Running(self.remaining)
    }
}
