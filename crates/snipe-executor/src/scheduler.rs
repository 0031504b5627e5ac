//! Deadline scheduler.
//!
//! Hybrid wait: yielding sleeps while more than `spin_threshold` remains,
//! then a non-yielding poll loop for the final stretch. Never returns
//! before the target; may return marginally late.

use std::time::Duration;
use tracing::trace;

use crate::clock::{ClockOffset, DynClock};
use crate::racer::SuccessFlag;

/// Default switch-over from sleeping to spinning.
pub const DEFAULT_SPIN_THRESHOLD: Duration = Duration::from_millis(5);

/// Result of a cancellable wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Target reached and no success signal observed.
    Reached,
    /// Success signal observed; the caller must not send.
    Cancelled,
}

/// Waits for exchange-clock instants.
#[derive(Clone)]
pub struct Scheduler {
    clock: DynClock,
    offset: ClockOffset,
    spin_threshold: Duration,
}

impl Scheduler {
    pub fn new(clock: DynClock, offset: ClockOffset, spin_threshold: Duration) -> Self {
        Self {
            clock,
            offset,
            spin_threshold,
        }
    }

    pub fn clock(&self) -> &DynClock {
        &self.clock
    }

    pub fn offset(&self) -> ClockOffset {
        self.offset
    }

    /// Exchange time now, in milliseconds.
    pub fn exchange_now_ms(&self) -> i64 {
        self.offset.stamp(self.clock.as_ref())
    }

    /// Microseconds until `target_exchange_ms`; negative once passed.
    fn remaining_us(&self, target_exchange_ms: i64) -> i64 {
        target_exchange_ms * 1_000 - self.offset.exchange_now_us(self.clock.as_ref())
    }

    /// Wait until `target_exchange_ms`, aborting if `flag` is set.
    ///
    /// The flag is checked after every coarse sleep and once more at the
    /// deadline, immediately before returning `Reached`.
    pub async fn wait_until(&self, target_exchange_ms: i64, flag: &SuccessFlag) -> WaitOutcome {
        self.wait(target_exchange_ms, Some(flag)).await
    }

    /// Wait until `target_exchange_ms` without a cancellation signal.
    pub async fn sleep_until(&self, target_exchange_ms: i64) {
        self.wait(target_exchange_ms, None).await;
    }

    async fn wait(&self, target_exchange_ms: i64, flag: Option<&SuccessFlag>) -> WaitOutcome {
        let cancelled = || flag.is_some_and(SuccessFlag::is_set);
        let threshold_us = self.spin_threshold.as_micros() as i64;

        // Coarse phase: yield the thread.
        loop {
            if cancelled() {
                return WaitOutcome::Cancelled;
            }
            let remaining = self.remaining_us(target_exchange_ms);
            if remaining <= threshold_us {
                break;
            }
            let nap = Duration::from_micros((remaining - threshold_us) as u64);
            trace!(target_exchange_ms, nap_us = nap.as_micros() as u64, "Coarse wait");
            self.clock.sleep(nap).await;
        }

        // Fine phase: spin until the target instant.
        while self.remaining_us(target_exchange_ms) > 0 {
            self.clock.spin();
        }

        if cancelled() {
            WaitOutcome::Cancelled
        } else {
            WaitOutcome::Reached
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("offset", &self.offset)
            .field("spin_threshold", &self.spin_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, MockClock, SystemClock};
    use std::sync::Arc;

    fn mock_scheduler(start_ms: i64, offset_ms: i64) -> (Arc<MockClock>, Scheduler) {
        let clock = Arc::new(MockClock::new(start_ms));
        let scheduler = Scheduler::new(
            clock.clone(),
            ClockOffset::new(offset_ms),
            DEFAULT_SPIN_THRESHOLD,
        );
        (clock, scheduler)
    }

    #[tokio::test]
    async fn test_never_returns_early() {
        let (clock, scheduler) = mock_scheduler(1_000_000, 0);
        let flag = SuccessFlag::new();

        let outcome = scheduler.wait_until(1_002_000, &flag).await;
        assert_eq!(outcome, WaitOutcome::Reached);
        let now_us = clock.now_us();
        assert!(now_us >= 1_002_000_000);
        assert!(now_us < 1_002_000_000 + MockClock::DEFAULT_SPIN_TICK_US);
    }

    #[tokio::test]
    async fn test_coarse_sleep_stops_at_threshold() {
        let (clock, scheduler) = mock_scheduler(0, 0);
        let flag = SuccessFlag::new();

        scheduler.wait_until(1_000, &flag).await;
        // One sleep of (1000ms - 5ms), the rest spun.
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(995)]);
    }

    #[tokio::test]
    async fn test_target_is_exchange_time() {
        // Exchange is 300ms ahead, so exchange 10_000 is local 9_700.
        let (clock, scheduler) = mock_scheduler(9_000, 300);
        scheduler.sleep_until(10_000).await;
        assert!(clock.now_ms() >= 9_700);
        assert!(clock.now_ms() < 9_701);
    }

    #[tokio::test]
    async fn test_past_target_returns_immediately() {
        let (clock, scheduler) = mock_scheduler(5_000, 0);
        let flag = SuccessFlag::new();

        assert_eq!(scheduler.wait_until(4_000, &flag).await, WaitOutcome::Reached);
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.now_ms(), 5_000);
    }

    #[tokio::test]
    async fn test_cancelled_when_flag_already_set() {
        let (_clock, scheduler) = mock_scheduler(0, 0);
        let flag = SuccessFlag::new();
        assert!(flag.try_claim());

        assert_eq!(scheduler.wait_until(10, &flag).await, WaitOutcome::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_real_clock_accuracy_bound() {
        let clock: DynClock = Arc::new(SystemClock);
        let scheduler = Scheduler::new(clock.clone(), ClockOffset::default(), DEFAULT_SPIN_THRESHOLD);
        let flag = SuccessFlag::new();

        let target_ms = clock.now_ms() + 50;
        let outcome = scheduler.wait_until(target_ms, &flag).await;
        let fired_us = clock.now_us();

        assert_eq!(outcome, WaitOutcome::Reached);
        assert!(fired_us >= target_ms * 1_000);
        assert!(fired_us < target_ms * 1_000 + 2_000, "late by {}us", fired_us - target_ms * 1_000);
    }
}
