//! Time sources and exchange clock offset.
//!
//! All scheduling goes through the [`Clock`] trait so tests can drive time
//! without real sleeping.
//!
//! # Offset Convention
//! `offset_ms = server_time - local_time`
//! - Positive: server clock is ahead of local
//! - Negative: server clock is behind local

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use snipe_rest::{BoxFuture, ExchangeApi};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ExecutorError, ExecutorResult};

/// Trait for obtaining current time and suspending, enabling testability.
pub trait Clock: Send + Sync {
    /// Current local time in microseconds since Unix epoch.
    fn now_us(&self) -> i64;

    /// Current local time in milliseconds since Unix epoch.
    fn now_ms(&self) -> i64 {
        self.now_us().div_euclid(1_000)
    }

    /// Yielding suspension for roughly `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// One iteration of a non-yielding poll loop.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// Arc wrapper for Clock trait objects.
pub type DynClock = Arc<dyn Clock>;

/// Wall-clock instant for a Unix-microsecond timestamp.
pub fn utc_from_us(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or_default()
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> i64 {
        Utc::now().timestamp_micros()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Manually driven clock for tests.
///
/// `sleep` advances time by the requested duration and yields once;
/// `spin` advances time by a fixed tick. Every sleep is recorded.
#[derive(Debug)]
pub struct MockClock {
    now_us: AtomicI64,
    spin_tick_us: i64,
    sleeps: Mutex<Vec<Duration>>,
}

impl MockClock {
    /// Default advance per `spin` call.
    pub const DEFAULT_SPIN_TICK_US: i64 = 50;

    pub fn new(start_ms: i64) -> Self {
        Self::with_spin_tick(start_ms, Self::DEFAULT_SPIN_TICK_US)
    }

    pub fn with_spin_tick(start_ms: i64, spin_tick_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(start_ms * 1_000),
            spin_tick_us,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_us.store(ms * 1_000, Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        self.now_us
            .fetch_add(duration.as_micros() as i64, Ordering::SeqCst);
    }

    /// Durations passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleeps.lock().push(duration);
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }

    fn spin(&self) {
        self.now_us.fetch_add(self.spin_tick_us, Ordering::SeqCst);
    }
}

/// Correction from local time to exchange time, in milliseconds.
///
/// Measured once per run and never refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockOffset(i64);

impl ClockOffset {
    /// Warn when local and exchange clocks disagree by more than this.
    pub const DRIFT_WARN_THRESHOLD_MS: i64 = 2_000;

    pub fn new(offset_ms: i64) -> Self {
        Self(offset_ms)
    }

    /// `server_ms - local_ms`.
    pub fn measure(server_ms: i64, local_ms: i64) -> Self {
        Self(server_ms - local_ms)
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Translate a local timestamp into exchange time.
    pub fn to_exchange_ms(&self, local_ms: i64) -> i64 {
        local_ms + self.0
    }

    /// Translate an exchange timestamp into local time.
    pub fn to_local_ms(&self, exchange_ms: i64) -> i64 {
        exchange_ms - self.0
    }

    /// Exchange time now, in microseconds.
    pub fn exchange_now_us(&self, clock: &dyn Clock) -> i64 {
        clock.now_us() + self.0 * 1_000
    }

    /// Timestamp to stamp on an outbound request: `local_now + offset`.
    pub fn stamp(&self, clock: &dyn Clock) -> i64 {
        self.to_exchange_ms(clock.now_ms())
    }
}

/// One-shot clock synchronization against the exchange.
///
/// Local time is read when the server time response arrives. No retry and
/// no round-trip compensation.
///
/// # Errors
/// `ExecutorError::ClockSync` if the server time cannot be fetched.
pub async fn synchronize(api: &dyn ExchangeApi, clock: &dyn Clock) -> ExecutorResult<ClockOffset> {
    let server_ms = api.server_time().await.map_err(ExecutorError::ClockSync)?;
    let local_ms = clock.now_ms();
    let offset = ClockOffset::measure(server_ms, local_ms);

    if offset.as_ms().abs() > ClockOffset::DRIFT_WARN_THRESHOLD_MS {
        warn!(
            offset_ms = offset.as_ms(),
            threshold_ms = ClockOffset::DRIFT_WARN_THRESHOLD_MS,
            "Local clock drift from exchange is large"
        );
    }
    info!(
        server_ms,
        local_ms,
        offset_ms = offset.as_ms(),
        "Clock synchronized with exchange"
    );
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipe_rest::{MockExchange, RestError};

    #[test]
    fn test_offset_stamping() {
        // Server S at local L, later stamped at L'.
        let clock = MockClock::new(1_000_000);
        let offset = ClockOffset::measure(1_000_250, 1_000_000);
        assert_eq!(offset.as_ms(), 250);

        clock.set_ms(1_002_000);
        assert_eq!(offset.stamp(&clock), 1_002_000 + 250);
        assert_eq!(offset.to_local_ms(offset.to_exchange_ms(5)), 5);
    }

    #[test]
    fn test_negative_offset() {
        let offset = ClockOffset::measure(999_900, 1_000_000);
        assert_eq!(offset.as_ms(), -100);
        assert_eq!(offset.to_exchange_ms(2_000_000), 1_999_900);
    }

    #[tokio::test]
    async fn test_synchronize_measures_offset() {
        let api = MockExchange::new();
        api.set_server_time(1_752_058_790_000);
        let clock = MockClock::new(1_752_058_789_600);

        let offset = synchronize(&api, &clock).await.unwrap();
        assert_eq!(offset.as_ms(), 400);
        assert_eq!(api.server_time_calls(), 1);
    }

    #[tokio::test]
    async fn test_synchronize_failure_is_fatal() {
        let api = MockExchange::new();
        api.fail_server_time(RestError::Timeout("no route".into()));
        let clock = MockClock::new(0);

        let result = synchronize(&api, &clock).await;
        assert!(matches!(result, Err(ExecutorError::ClockSync(_))));
    }

    #[tokio::test]
    async fn test_mock_clock_sleep_advances_time() {
        let clock = MockClock::new(10);
        clock.sleep(Duration::from_millis(500)).await;
        assert_eq!(clock.now_ms(), 510);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn test_utc_from_us() {
        let dt = utc_from_us(1_752_058_800_000_000);
        assert_eq!(dt.timestamp_millis(), 1_752_058_800_000);
    }
}
