//! Acquisition price derivation.
//!
//! A quote is computed once before the race and held constant; it is not
//! refreshed between attempts.

use rust_decimal::Decimal;
use snipe_core::{OrderIntent, Price, Size};

/// Limit price and quantity derived from the best ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub best_ask: Price,
    /// `round(ask * (1 + markup/100), 8)`.
    pub limit_price: Price,
    /// `round(budget / limit_price, 6)`.
    pub quantity: Size,
}

/// How the race orders are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// LIMIT/IOC at the quoted price and quantity.
    Limit(PriceQuote),
    /// MARKET spending the quote budget; no book was available.
    Market,
}

impl OrderMode {
    pub fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }

    pub fn quote(&self) -> Option<&PriceQuote> {
        match self {
            Self::Limit(quote) => Some(quote),
            Self::Market => None,
        }
    }

    /// Race order template for this mode.
    pub fn intent(&self, symbol: &str, budget: Decimal, recv_window_ms: u64) -> OrderIntent {
        match self {
            Self::Limit(quote) => {
                OrderIntent::limit_ioc_buy(symbol, quote.limit_price, quote.quantity, recv_window_ms)
            }
            Self::Market => OrderIntent::market_buy(symbol, budget, recv_window_ms),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Limit(_) => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

/// Derives limit quotes from the top of book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceStrategy {
    markup_pct: Decimal,
}

impl PriceStrategy {
    pub fn new(markup_pct: Decimal) -> Self {
        Self { markup_pct }
    }

    /// Quote for `best_ask`, or `None` when there is no usable ask.
    ///
    /// A quote whose quantity rounds to zero is also `None`: such an order
    /// could never fill, so the budget is better spent at market.
    pub fn derive(&self, best_ask: Option<Price>, budget: Decimal) -> Option<PriceQuote> {
        let ask = best_ask.filter(Price::is_positive)?;
        let limit_price = ask.with_markup(self.markup_pct);
        let quantity = Size::from_budget(budget, limit_price).filter(Size::is_positive)?;

        Some(PriceQuote {
            best_ask: ask,
            limit_price,
            quantity,
        })
    }

    /// LIMIT when a quote can be derived, MARKET otherwise.
    pub fn resolve(&self, best_ask: Option<Price>, budget: Decimal) -> OrderMode {
        self.derive(best_ask, budget)
            .map_or(OrderMode::Market, OrderMode::Limit)
    }
}
