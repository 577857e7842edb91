//! One-second countdown and the tick sources that drive it.
//!
//! `Countdown` holds the timer state and turns each pulse into a
//! [`ClockSignal`]. The pulse itself comes from a [`TickSource`]: a real
//! tokio interval in production, or [`LogicalTicks`] where every await is
//! one simulated second.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Countdown lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    Idle,
    Running,
    Canceled,
    Expired,
}

/// What a single pulse did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// One second elapsed; carries the remaining seconds.
    Tick(u32),
    /// Remaining time reached zero. Emitted once per start.
    Expired,
}

/// A cancelable countdown with one-second resolution.
#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    status: ClockStatus,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            remaining: 0,
            status: ClockStatus::Idle,
        }
    }

    /// Begin counting down from `total_secs`. A running countdown is
    /// canceled and restarted.
    pub fn start(&mut self, total_secs: u32) {
        if self.status == ClockStatus::Running {
            tracing::debug!(remaining = self.remaining, "restarting running countdown");
            self.cancel();
        }
        self.remaining = total_secs;
        self.status = ClockStatus::Running;
    }

    /// Stop all future ticks. Safe to call in any state.
    pub fn cancel(&mut self) {
        if self.status == ClockStatus::Running {
            self.status = ClockStatus::Canceled;
        }
    }

    /// Advance by one second. Returns `None` unless running.
    pub fn tick(&mut self) -> Option<ClockSignal> {
        if self.status != ClockStatus::Running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.status = ClockStatus::Expired;
            Some(ClockSignal::Expired)
        } else {
            Some(ClockSignal::Tick(self.remaining))
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn status(&self) -> ClockStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ClockStatus::Running
    }
}

// ---------------------------------------------------------------------------
// Tick sources
// ---------------------------------------------------------------------------

/// Source of one-second pulses.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next pulse.
    async fn tick(&mut self);

    /// Re-phase so the next pulse is a full second away.
    fn reset(&mut self) {}
}

/// Real-time pulses backed by a tokio interval.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Default for IntervalTicks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }

    fn reset(&mut self) {
        self.interval.reset();
    }
}

/// Logical pulses: every call returns immediately.
#[derive(Debug, Default)]
pub struct LogicalTicks {
    emitted: u64,
}

impl LogicalTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulses emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[async_trait]
impl TickSource for LogicalTicks {
    async fn tick(&mut self) {
        self.emitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_once() {
        let mut clock = Countdown::new();
        clock.start(3);
        assert_eq!(clock.tick(), Some(ClockSignal::Tick(2)));
        assert_eq!(clock.tick(), Some(ClockSignal::Tick(1)));
        assert_eq!(clock.tick(), Some(ClockSignal::Expired));
        assert_eq!(clock.status(), ClockStatus::Expired);
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn sixty_ticks_expire_a_one_minute_budget() {
        let mut clock = Countdown::new();
        clock.start(60);
        let signals: Vec<_> = (0..60).filter_map(|_| clock.tick()).collect();
        assert_eq!(signals.len(), 60);
        assert_eq!(signals.last(), Some(&ClockSignal::Expired));
        assert_eq!(
            signals
                .iter()
                .filter(|s| **s == ClockSignal::Expired)
                .count(),
            1
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut clock = Countdown::new();
        clock.cancel();
        assert_eq!(clock.status(), ClockStatus::Idle);

        clock.start(10);
        clock.cancel();
        clock.cancel();
        assert_eq!(clock.status(), ClockStatus::Canceled);
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.remaining(), 10);
    }

    #[test]
    fn cancel_after_expiry_keeps_expired() {
        let mut clock = Countdown::new();
        clock.start(1);
        assert_eq!(clock.tick(), Some(ClockSignal::Expired));
        clock.cancel();
        assert_eq!(clock.status(), ClockStatus::Expired);
    }

    #[test]
    fn restart_replaces_running_countdown() {
        let mut clock = Countdown::new();
        clock.start(10);
        clock.tick();
        clock.start(5);
        assert!(clock.is_running());
        assert_eq!(clock.remaining(), 5);
    }

    #[test]
    fn zero_budget_expires_on_first_tick() {
        let mut clock = Countdown::new();
        clock.start(0);
        assert_eq!(clock.tick(), Some(ClockSignal::Expired));
    }

    #[tokio::test]
    async fn logical_ticks_resolve_immediately() {
        let mut ticks = LogicalTicks::new();
        for _ in 0..5 {
            ticks.tick().await;
        }
        assert_eq!(ticks.emitted(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_once_per_second() {
        let mut ticks = IntervalTicks::new();
        let start = Instant::now();
        ticks.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        ticks.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
