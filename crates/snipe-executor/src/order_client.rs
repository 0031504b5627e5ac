//! Order submission: stamp, sign, send, classify.
//!
//! Every response is awaited and classified; a failed send becomes an
//! `AttemptStatus::Error` outcome, never an `Err`.

use rust_decimal::Decimal;
use snipe_core::{AttemptOutcome, AttemptStatus, OrderIntent, Price, Size};
use snipe_rest::{DynExchange, OrderResponse, RestResult};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::clock::{utc_from_us, ClockOffset, DynClock};
use crate::signer::Signer;

/// Quote amount of the warmup order.
pub const WARMUP_QUOTE_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Receive window of the warmup order.
pub const WARMUP_RECV_WINDOW_MS: u64 = 2_000;

/// How far in the past the warmup order is stamped, so it is rejected.
pub const WARMUP_BACKDATE_MS: i64 = 100_000;

/// Position of an order in the run's send schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptSlot {
    /// 1-based.
    pub index: usize,
    /// Offset from T0; `None` outside the race.
    pub offset_ms: Option<i64>,
}

/// Order template with its unsigned parameters already rendered.
///
/// Built before the timing-critical wait; only `timestamp` and `signature`
/// are added at send time.
#[derive(Debug, Clone)]
pub struct PreparedOrder {
    intent: OrderIntent,
    params: BTreeMap<&'static str, String>,
}

impl PreparedOrder {
    pub fn new(intent: OrderIntent) -> Self {
        let params = intent.to_params();
        Self { intent, params }
    }

    pub fn intent(&self) -> &OrderIntent {
        &self.intent
    }
}

/// Thin signed-order wrapper around the exchange API.
#[derive(Clone)]
pub struct OrderClient {
    api: DynExchange,
    signer: Signer,
    clock: DynClock,
    offset: ClockOffset,
}

impl OrderClient {
    pub fn new(api: DynExchange, signer: Signer, clock: DynClock, offset: ClockOffset) -> Self {
        Self {
            api,
            signer,
            clock,
            offset,
        }
    }

    pub fn offset(&self) -> ClockOffset {
        self.offset
    }

    /// Stamp with `local_now + offset`, sign and send; always returns an
    /// outcome.
    pub async fn send(&self, order: &PreparedOrder, slot: AttemptSlot) -> AttemptOutcome {
        let timestamp = self.offset.stamp(self.clock.as_ref());
        let query = self
            .signer
            .sign_query(order.params.iter().map(|(k, v)| (*k, v.as_str())), timestamp);

        let sent_us = self.clock.now_us();
        let response = self.api.place_order(query).await;
        let received_us = self.clock.now_us();

        let outcome = classify(&order.intent, slot, response, sent_us, received_us);
        debug!(
            attempt = slot.index,
            offset_ms = ?slot.offset_ms,
            side = %outcome.side,
            status = %outcome.status,
            latency_ms = outcome.latency_ms,
            executed_qty = %outcome.executed_qty,
            "Order response classified"
        );
        outcome
    }

    /// Dummy MARKET buy dated in the past, to open the connection and
    /// exercise the credentials before the timing-critical window.
    ///
    /// The response is discarded.
    pub async fn warmup(&self, symbol: &str) {
        let intent = OrderIntent::market_buy(symbol, WARMUP_QUOTE_AMOUNT, WARMUP_RECV_WINDOW_MS);
        let timestamp = self.offset.stamp(self.clock.as_ref()) - WARMUP_BACKDATE_MS;
        let query = self.signer.sign_query(intent.to_params(), timestamp);

        let started_us = self.clock.now_us();
        let result = self.api.place_order(query).await;
        let latency_ms = (self.clock.now_us() - started_us) as f64 / 1_000.0;

        match result {
            Ok(resp) => debug!(
                latency_ms,
                code = ?resp.code,
                msg = ?resp.msg,
                "Warmup order answered"
            ),
            Err(e) => debug!(latency_ms, error = %e, "Warmup order failed"),
        }
    }
}

impl std::fmt::Debug for OrderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderClient")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// Price the order actually executed at.
///
/// Response `price` when positive; else `cummulativeQuoteQty / executedQty`
/// when both are positive; else the intent's limit price.
pub fn effective_price(intent: &OrderIntent, response: &OrderResponse) -> Option<Price> {
    let positive = |d: &Decimal| d.is_sign_positive() && !d.is_zero();

    if let Some(price) = response.price.filter(positive) {
        return Some(Price::new(price));
    }
    let executed = response.executed_qty.filter(positive);
    let quote = response.cumulative_quote_qty.filter(positive);
    if let (Some(executed), Some(quote)) = (executed, quote) {
        return Some(Price::new(quote / executed).round_exchange());
    }
    intent.price.filter(Price::is_positive)
}

/// Map a send result onto an attempt outcome.
///
/// - executed quantity > 0 ⇒ FILLED
/// - order id present, nothing executed ⇒ NO_FILL
/// - no order id, or transport/parse failure ⇒ ERROR
pub fn classify(
    intent: &OrderIntent,
    slot: AttemptSlot,
    response: RestResult<OrderResponse>,
    sent_us: i64,
    received_us: i64,
) -> AttemptOutcome {
    let base = |status: AttemptStatus, message: String| AttemptOutcome {
        index: slot.index,
        offset_ms: slot.offset_ms,
        side: intent.side,
        sent_at: utc_from_us(sent_us),
        received_at: utc_from_us(received_us),
        latency_ms: (received_us - sent_us) as f64 / 1_000.0,
        status,
        executed_qty: Size::ZERO,
        price: None,
        order_id: None,
        message,
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            warn!(attempt = slot.index, error = %e, "Order send failed");
            return base(AttemptStatus::Error, e.to_string());
        }
    };

    let message = exchange_message(&response);
    let Some(order_id) = response.order_id.clone() else {
        return base(AttemptStatus::Error, message);
    };

    let executed = response.executed();
    if executed > Decimal::ZERO {
        AttemptOutcome {
            executed_qty: Size::new(executed),
            price: effective_price(intent, &response),
            order_id: Some(order_id),
            ..base(AttemptStatus::Filled, message)
        }
    } else {
        AttemptOutcome {
            price: intent.price,
            order_id: Some(order_id),
            ..base(AttemptStatus::NoFill, message)
        }
    }
}

fn exchange_message(response: &OrderResponse) -> String {
    match (response.code, response.msg.as_deref()) {
        (Some(code), Some(msg)) => format!("[{code}] {msg}"),
        (Some(code), None) => format!("[{code}]"),
        (None, Some(msg)) => msg.to_string(),
        (None, None) if response.order_id.is_some() => "accepted".to_string(),
        (None, None) => "no order id in response".to_string(),
    }
}
