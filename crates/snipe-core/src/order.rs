//! Order-related types.
//!
//! Provides order side, type, time-in-force and the unsigned order template
//! (`OrderIntent`) that the executor stamps, signs and sends.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decimal::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Exchange wire name.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Limit order (IOC for racing buys, GTC for the take-profit).
    Limit,
    /// Market order, used when no book is available at T0.
    Market,
}

impl OrderType {
    /// Exchange wire name.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled.
    #[serde(rename = "GTC")]
    GoodTilCancelled,
    /// Immediate-or-cancel (racing buys).
    #[default]
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
}

impl TimeInForce {
    /// Exchange wire name.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::GoodTilCancelled => "GTC",
            Self::ImmediateOrCancel => "IOC",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// How much an order buys or sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderQuantity {
    /// Base-asset quantity (`quantity=`).
    Base(Size),
    /// Quote-currency amount (`quoteOrderQty=`), market buys only.
    Quote(Decimal),
}

/// Unsigned order template.
///
/// Built once per attempt, outside the timing-critical wait. The executor
/// adds `timestamp` and `signature` immediately before sending, so an
/// intent never carries attempt-local stamping state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Limit price (limit orders only).
    pub price: Option<Price>,
    pub quantity: OrderQuantity,
    /// Time-in-force (limit orders only).
    pub time_in_force: Option<TimeInForce>,
    /// Exchange-side staleness tolerance in milliseconds.
    pub recv_window_ms: u64,
}

impl OrderIntent {
    /// LIMIT/IOC buy used by the racing attempts.
    #[must_use]
    pub fn limit_ioc_buy(
        symbol: impl Into<String>,
        price: Price,
        quantity: Size,
        recv_window_ms: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity: OrderQuantity::Base(quantity),
            time_in_force: Some(TimeInForce::ImmediateOrCancel),
            recv_window_ms,
        }
    }

    /// MARKET buy spending a quote-currency budget (no-book fallback).
    #[must_use]
    pub fn market_buy(symbol: impl Into<String>, quote_amount: Decimal, recv_window_ms: u64) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            price: None,
            quantity: OrderQuantity::Quote(quote_amount),
            time_in_force: None,
            recv_window_ms,
        }
    }

    /// LIMIT/GTC sell used for the take-profit.
    #[must_use]
    pub fn limit_gtc_sell(
        symbol: impl Into<String>,
        price: Price,
        quantity: Size,
        recv_window_ms: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity: OrderQuantity::Base(quantity),
            time_in_force: Some(TimeInForce::GoodTilCancelled),
            recv_window_ms,
        }
    }

    /// Request parameters without `timestamp` and `signature`.
    ///
    /// Keys are held in a `BTreeMap` so iteration order is the ascending
    /// lexicographic order the exchange signs over.
    pub fn to_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("symbol", self.symbol.clone());
        params.insert("side", self.side.as_wire().to_string());
        params.insert("type", self.order_type.as_wire().to_string());
        if let Some(price) = self.price {
            params.insert("price", price.to_wire());
        }
        match self.quantity {
            OrderQuantity::Base(size) => {
                params.insert("quantity", size.to_wire());
            }
            OrderQuantity::Quote(amount) => {
                params.insert("quoteOrderQty", amount.normalize().to_string());
            }
        }
        if let Some(tif) = self.time_in_force {
            params.insert("timeInForce", tif.as_wire().to_string());
        }
        params.insert("recvWindow", self.recv_window_ms.to_string());
        params
    }
}
