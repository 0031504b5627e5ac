//! Take-profit sell after a winning fill.
//!
//! One LIMIT/GTC sell, fire-and-log: no confirmation loop, no retry.

use rust_decimal::Decimal;
use snipe_core::{AttemptOutcome, AttemptStatus, OrderIntent, Price, Size};
use tracing::{error, info, warn};

use crate::order_client::{AttemptSlot, OrderClient, PreparedOrder};

/// Sell price and quantity for a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeProfit {
    /// `round(buy_price * (1 + profit/100), 8)`.
    pub price: Price,
    /// `round(filled, 6)`.
    pub quantity: Size,
}

impl TakeProfit {
    /// `None` when the fill has no usable price or rounds to nothing.
    pub fn for_fill(buy_price: Price, filled: Size, profit_pct: Decimal) -> Option<Self> {
        if !buy_price.is_positive() {
            return None;
        }
        let quantity = filled.round_exchange();
        if !quantity.is_positive() {
            return None;
        }
        Some(Self {
            price: buy_price.with_markup(profit_pct),
            quantity,
        })
    }
}

/// Result of the follow-up step.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUpReport {
    /// The exchange accepted the sell.
    Placed(TakeProfit, AttemptOutcome),
    /// The sell was sent and failed. Not retried.
    Failed(TakeProfit, AttemptOutcome),
    /// Nothing sent: the fill price or quantity was unusable.
    Skipped,
}

/// Places the take-profit sell.
#[derive(Debug, Clone)]
pub struct FollowUp {
    client: OrderClient,
    profit_pct: Decimal,
    recv_window_ms: u64,
}

impl FollowUp {
    pub fn new(client: OrderClient, profit_pct: Decimal, recv_window_ms: u64) -> Self {
        Self {
            client,
            profit_pct,
            recv_window_ms,
        }
    }

    /// Sell the winner's fill at the profit target.
    ///
    /// `index` is the sell's position in the run's send log.
    pub async fn place(&self, symbol: &str, winner: &AttemptOutcome, index: usize) -> FollowUpReport {
        let take_profit = winner
            .price
            .and_then(|price| TakeProfit::for_fill(price, winner.executed_qty, self.profit_pct));
        let Some(take_profit) = take_profit else {
            warn!(
                symbol,
                price = ?winner.price,
                executed_qty = %winner.executed_qty,
                "No usable fill price or quantity, take-profit skipped"
            );
            return FollowUpReport::Skipped;
        };

        let intent = OrderIntent::limit_gtc_sell(
            symbol,
            take_profit.price,
            take_profit.quantity,
            self.recv_window_ms,
        );
        let slot = AttemptSlot {
            index,
            offset_ms: None,
        };
        let outcome = self.client.send(&PreparedOrder::new(intent), slot).await;

        if outcome.status == AttemptStatus::Error {
            error!(
                symbol,
                price = %take_profit.price,
                quantity = %take_profit.quantity,
                latency_ms = outcome.latency_ms,
                message = %outcome.message,
                "Take-profit sell failed"
            );
            FollowUpReport::Failed(take_profit, outcome)
        } else {
            info!(
                symbol,
                price = %take_profit.price,
                quantity = %take_profit.quantity,
                latency_ms = outcome.latency_ms,
                order_id = ?outcome.order_id,
                "Take-profit sell placed"
            );
            FollowUpReport::Placed(take_profit, outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockOffset, MockClock};
    use crate::signer::Signer;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use snipe_core::OrderSide;
    use snipe_rest::{MockExchange, OrderResponse};
    use std::sync::Arc;

    fn winner(price: Option<Price>, qty: Decimal) -> AttemptOutcome {
        let now = Utc::now();
        AttemptOutcome {
            index: 2,
            offset_ms: Some(-5),
            side: OrderSide::Buy,
            sent_at: now,
            received_at: now,
            latency_ms: 3.0,
            status: AttemptStatus::Filled,
            executed_qty: Size::new(qty),
            price,
            order_id: Some("42".to_string()),
            message: "accepted".to_string(),
        }
    }

    fn follow_up(api: Arc<MockExchange>) -> FollowUp {
        let client = OrderClient::new(
            api,
            Signer::new("secret").unwrap(),
            Arc::new(MockClock::new(1_000)),
            ClockOffset::default(),
        );
        FollowUp::new(client, dec!(200), 5000)
    }

    #[test]
    fn test_take_profit_pricing() {
        let tp = TakeProfit::for_fill(
            Price::new(dec!(120.14814815)),
            Size::new(dec!(0.0166461)),
            dec!(200),
        )
        .unwrap();
        assert_eq!(tp.price.inner(), dec!(360.44444445));
        assert_eq!(tp.quantity.inner(), dec!(0.016646));
    }

    #[test]
    fn test_take_profit_needs_price() {
        assert!(TakeProfit::for_fill(Price::ZERO, Size::new(dec!(1)), dec!(200)).is_none());
        assert!(TakeProfit::for_fill(Price::new(dec!(1)), Size::new(dec!(0.0000001)), dec!(200)).is_none());
    }

    #[tokio::test]
    async fn test_places_gtc_sell() {
        let api = Arc::new(MockExchange::new());
        api.push_order_response(OrderResponse::no_fill("sell-1"));

        let report = follow_up(api.clone())
            .place("NEWUSDT", &winner(Some(Price::new(dec!(120.14814815))), dec!(0.016646)), 4)
            .await;

        assert!(matches!(report, FollowUpReport::Placed(_, ref o) if o.index == 4));
        let sent = api.received_orders();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].get("side"), Some("SELL"));
        assert_eq!(sent[0].get("type"), Some("LIMIT"));
        assert_eq!(sent[0].get("timeInForce"), Some("GTC"));
        assert_eq!(sent[0].get("price"), Some("360.44444445"));
        assert_eq!(sent[0].get("quantity"), Some("0.016646"));
    }

    #[tokio::test]
    async fn test_rejected_sell_is_reported_not_retried() {
        let api = Arc::new(MockExchange::new());
        api.push_order_response(OrderResponse::rejected(30005, "Oversold"));

        let report = follow_up(api.clone())
            .place("NEWUSDT", &winner(Some(Price::new(dec!(2))), dec!(1)), 2)
            .await;

        assert!(matches!(report, FollowUpReport::Failed(..)));
        assert_eq!(api.order_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_fill_price_skips_sell() {
        let api = Arc::new(MockExchange::new());
        let report = follow_up(api.clone())
            .place("NEWUSDT", &winner(None, dec!(1)), 2)
            .await;

        assert_eq!(report, FollowUpReport::Skipped);
        assert_eq!(api.order_count(), 0);
    }
}
