//! Shared fixtures for engine tests.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use snipe_bot::{Engine, EngineSettings};
use snipe_core::{Credentials, ListingTarget};
use snipe_executor::MockClock;
use snipe_rest::{MockExchange, OrderResponse, SignedQuery};
use std::sync::Arc;

/// 2025-07-09T11:00:00Z.
pub const T0_MS: i64 = 1_752_058_800_000;

/// Exchange clock runs this far ahead of the local clock.
pub const SERVER_AHEAD_MS: i64 = 120;

pub const SECRET: &str = "test-secret";

pub fn target(budget: Decimal) -> ListingTarget {
    let t0 = Utc.with_ymd_and_hms(2025, 7, 9, 11, 0, 0).unwrap();
    ListingTarget::new("NEWUSDT", budget, t0, Decimal::from(20), Decimal::from(200)).unwrap()
}

pub fn credentials() -> Credentials {
    Credentials::new("test-key", SECRET).unwrap()
}

/// Mock exchange whose clock is `SERVER_AHEAD_MS` ahead of a local clock
/// starting `lead_ms` before T0.
pub fn exchange_and_clock(lead_ms: i64) -> (Arc<MockExchange>, Arc<MockClock>) {
    let local_start = T0_MS - SERVER_AHEAD_MS - lead_ms;
    let api = Arc::new(MockExchange::new());
    api.set_server_time(local_start + SERVER_AHEAD_MS);
    (api, Arc::new(MockClock::new(local_start)))
}

pub fn engine(api: &Arc<MockExchange>, clock: &Arc<MockClock>, warmup: bool) -> Engine {
    let settings = EngineSettings {
        warmup,
        ..EngineSettings::default()
    };
    Engine::new(api.clone(), clock.clone(), settings)
}

/// Rejection the exchange gives a backdated order.
pub fn warmup_rejection() -> OrderResponse {
    OrderResponse::rejected(700003, "Timestamp for this request is outside of the recvWindow.")
}

pub fn is_warmup(query: &SignedQuery) -> bool {
    query.get("recvWindow") == Some("2000")
}

/// Race buys: BUY orders that are not the warmup.
pub fn race_orders(api: &MockExchange) -> Vec<SignedQuery> {
    api.received_orders()
        .into_iter()
        .filter(|q| q.get("side") == Some("BUY") && !is_warmup(q))
        .collect()
}

pub fn sell_orders(api: &MockExchange) -> Vec<SignedQuery> {
    api.received_orders()
        .into_iter()
        .filter(|q| q.get("side") == Some("SELL"))
        .collect()
}
