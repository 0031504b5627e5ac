//! Concurrent attempt racing with first-fill-wins semantics.
//!
//! One task per scheduled offset. The success flag is the only state the
//! tasks share; an attempt that finds it set at its deadline exits without
//! sending.

use futures_util::future::join_all;
use snipe_core::{AttemptOutcome, OrderIntent, RaceResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{ExecutorError, ExecutorResult};
use crate::order_client::{AttemptSlot, OrderClient, PreparedOrder};
use crate::scheduler::{Scheduler, WaitOutcome};

/// Set-once signal that some attempt has filled.
#[derive(Debug, Default)]
pub struct SuccessFlag(AtomicBool);

impl SuccessFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Atomically set the flag. Returns `true` only for the caller that
    /// actually flipped it.
    #[must_use]
    pub fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// What one racing task did.
enum TaskReport {
    Sent(AttemptOutcome),
    Skipped,
}

/// Fires one order per scheduled offset around T0.
#[derive(Debug, Clone)]
pub struct AttemptRacer {
    scheduler: Arc<Scheduler>,
    client: OrderClient,
    offsets_ms: Vec<i64>,
}

impl AttemptRacer {
    /// Offsets may be listed in any order; each attempt keeps its position
    /// as its index and fires at `t0 + offset`.
    ///
    /// # Errors
    /// `ExecutorError::InvalidSchedule` for an empty offset list or a
    /// repeated offset.
    pub fn new(
        scheduler: Arc<Scheduler>,
        client: OrderClient,
        offsets_ms: Vec<i64>,
    ) -> ExecutorResult<Self> {
        if offsets_ms.is_empty() {
            return Err(ExecutorError::InvalidSchedule(
                "at least one attempt offset is required".to_string(),
            ));
        }
        let mut sorted = offsets_ms.clone();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(ExecutorError::InvalidSchedule(format!(
                "attempt offset {}ms is listed twice",
                pair[0]
            )));
        }
        Ok(Self {
            scheduler,
            client,
            offsets_ms,
        })
    }

    pub fn offsets_ms(&self) -> &[i64] {
        &self.offsets_ms
    }

    /// Run the race against `t0_ms` (exchange clock).
    ///
    /// Waits for every task, including stragglers after a win, so the
    /// returned log is complete.
    pub async fn race(&self, t0_ms: i64, template: &OrderIntent) -> RaceResult {
        let flag = Arc::new(SuccessFlag::new());
        let order = PreparedOrder::new(template.clone());

        let handles: Vec<_> = self
            .offsets_ms
            .iter()
            .enumerate()
            .map(|(i, &offset_ms)| {
                let slot = AttemptSlot {
                    index: i + 1,
                    offset_ms: Some(offset_ms),
                };
                tokio::spawn(run_attempt(
                    self.scheduler.clone(),
                    self.client.clone(),
                    order.clone(),
                    flag.clone(),
                    slot,
                    t0_ms + offset_ms,
                ))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        let mut skipped = 0;
        for joined in join_all(handles).await {
            match joined {
                Ok(TaskReport::Sent(outcome)) => outcomes.push(outcome),
                Ok(TaskReport::Skipped) => skipped += 1,
                Err(e) => error!(error = %e, "Attempt task aborted"),
            }
        }

        let result = RaceResult::new(outcomes, skipped);
        info!(
            sent = result.outcomes().len(),
            skipped = result.skipped(),
            fills = result.fill_count(),
            winner = ?result.winner().map(|o| o.index),
            "Race complete"
        );
        if result.fill_count() > 1 {
            warn!(
                fills = result.fill_count(),
                "More than one attempt filled; position is larger than budgeted"
            );
        }
        result
    }
}

async fn run_attempt(
    scheduler: Arc<Scheduler>,
    client: OrderClient,
    order: PreparedOrder,
    flag: Arc<SuccessFlag>,
    slot: AttemptSlot,
    fire_at_ms: i64,
) -> TaskReport {
    if scheduler.wait_until(fire_at_ms, &flag).await == WaitOutcome::Cancelled {
        debug!(attempt = slot.index, "Fill already confirmed, not sending");
        return TaskReport::Skipped;
    }

    let outcome = client.send(&order, slot).await;
    if outcome.is_filled() {
        if flag.try_claim() {
            info!(
                attempt = slot.index,
                offset_ms = ?slot.offset_ms,
                executed_qty = %outcome.executed_qty,
                "Attempt won the race"
            );
        } else {
            warn!(attempt = slot.index, "Attempt filled after another attempt had won");
        }
    }
    TaskReport::Sent(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockOffset, DynClock, SystemClock};
    use crate::scheduler::DEFAULT_SPIN_THRESHOLD;
    use crate::signer::Signer;
    use rust_decimal_macros::dec;
    use snipe_core::{AttemptStatus, Price, Size};
    use snipe_rest::{MockExchange, OrderResponse, RestError};
    use std::time::Duration;

    fn racer(api: Arc<MockExchange>, offsets: Vec<i64>) -> (AttemptRacer, DynClock) {
        let clock: DynClock = Arc::new(SystemClock);
        let offset = ClockOffset::default();
        let scheduler = Arc::new(Scheduler::new(clock.clone(), offset, DEFAULT_SPIN_THRESHOLD));
        let client = OrderClient::new(api, Signer::new("secret").unwrap(), clock.clone(), offset);
        (AttemptRacer::new(scheduler, client, offsets).unwrap(), clock)
    }

    fn template() -> OrderIntent {
        OrderIntent::limit_ioc_buy(
            "NEWUSDT",
            Price::new(dec!(120.14814815)),
            Size::new(dec!(0.016646)),
            5000,
        )
    }

    #[test]
    fn test_flag_claimed_once() {
        let flag = SuccessFlag::new();
        assert!(!flag.is_set());
        assert!(flag.try_claim());
        assert!(!flag.try_claim());
        assert!(flag.is_set());
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let clock: DynClock = Arc::new(SystemClock);
        let scheduler = Arc::new(Scheduler::new(
            clock.clone(),
            ClockOffset::default(),
            DEFAULT_SPIN_THRESHOLD,
        ));
        let client = OrderClient::new(
            Arc::new(MockExchange::new()),
            Signer::new("secret").unwrap(),
            clock,
            ClockOffset::default(),
        );
        assert!(matches!(
            AttemptRacer::new(scheduler.clone(), client.clone(), vec![]),
            Err(ExecutorError::InvalidSchedule(_))
        ));
        assert!(matches!(
            AttemptRacer::new(scheduler, client, vec![-5, 0, -5]),
            Err(ExecutorError::InvalidSchedule(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_first_fill_stops_later_attempts() {
        // Attempt #2 fires first and fills; #1 and #3 reach their deadlines
        // after the flag is set and must not send.
        let api = Arc::new(MockExchange::new());
        api.push_order_response(OrderResponse::filled("2", dec!(0.016646), dec!(120.1)));
        let (racer, clock) = racer(api.clone(), vec![60, 0, 120]);

        let t0 = clock.now_ms() + 50;
        let result = racer.race(t0, &template()).await;

        assert_eq!(api.order_count(), 1);
        assert_eq!(result.skipped(), 2);
        let winner = result.winner().unwrap();
        assert_eq!(winner.index, 2);
        assert_eq!(winner.offset_ms, Some(0));
        assert!(winner.sent_at.timestamp_millis() >= t0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_unfilled_attempts_are_logged() {
        let api = Arc::new(MockExchange::new());
        for id in ["1", "2", "3"] {
            api.push_order_response(OrderResponse::no_fill(id));
        }
        let (racer, clock) = racer(api.clone(), vec![-10, -5, 0]);

        let t0 = clock.now_ms() + 40;
        let result = racer.race(t0, &template()).await;

        assert_eq!(api.order_count(), 3);
        assert!(result.winner().is_none());
        let statuses: Vec<_> = result.outcomes().iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![AttemptStatus::NoFill; 3]);
        for (outcome, offset) in result.outcomes().iter().zip([-10, -5, 0]) {
            assert!(outcome.sent_at.timestamp_millis() >= t0 + offset);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_error_does_not_cancel_siblings() {
        let api = Arc::new(MockExchange::new());
        api.push_order_error(RestError::Transport("connection reset".into()));
        api.push_order_response(OrderResponse::no_fill("2"));
        api.push_order_response(OrderResponse::filled("3", dec!(0.01), dec!(120)));
        let (racer, clock) = racer(api.clone(), vec![0, 8, 16]);

        let result = racer.race(clock.now_ms() + 40, &template()).await;

        let statuses: Vec<_> = result.outcomes().iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![AttemptStatus::Error, AttemptStatus::NoFill, AttemptStatus::Filled]
        );
        assert_eq!(result.winner().map(|o| o.index), Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stragglers_complete_and_winner_is_by_send_order() {
        // Responses take longer than the spacing, so all three are in
        // flight before any fill is known.
        let api = Arc::new(MockExchange::new());
        api.set_order_delay(Duration::from_millis(40));
        api.push_order_response(OrderResponse::filled("1", dec!(0.01), dec!(120)));
        api.push_order_response(OrderResponse::filled("2", dec!(0.01), dec!(120)));
        api.push_order_response(OrderResponse::no_fill("3"));
        let (racer, clock) = racer(api.clone(), vec![0, 6, 12]);

        let result = racer.race(clock.now_ms() + 40, &template()).await;

        assert_eq!(result.outcomes().len(), 3);
        assert_eq!(result.skipped(), 0);
        assert_eq!(result.fill_count(), 2);
        assert_eq!(result.winner().map(|o| o.index), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unsorted_offsets_winner_is_first_sent() {
        // Index 1 is scheduled after index 2; both are in flight before
        // either response arrives, and both fill.
        let api = Arc::new(MockExchange::new());
        api.set_order_delay(Duration::from_millis(60));
        api.push_order_response(OrderResponse::filled("first-sent", dec!(0.01), dec!(120)));
        api.push_order_response(OrderResponse::filled("second-sent", dec!(0.01), dec!(120)));
        let (racer, clock) = racer(api.clone(), vec![20, 0]);

        let result = racer.race(clock.now_ms() + 40, &template()).await;

        assert_eq!(result.fill_count(), 2);
        let winner = result.winner().unwrap();
        assert_eq!(winner.order_id.as_deref(), Some("first-sent"));
        assert_eq!(winner.index, 2);
        assert_eq!(winner.offset_ms, Some(0));
    }
}
