//! Exchange response types.
//!
//! Numeric fields are accepted either as JSON strings or numbers, and the
//! order id either as a string or an integer; exchanges are not consistent
//! about this across endpoints and error paths.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use snipe_core::Price;
use std::str::FromStr;

/// Response from the server time endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    /// Exchange epoch milliseconds.
    pub server_time: i64,
}

/// One `[price, qty]` level. Only the price is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BookLevel(pub Decimal, pub Decimal);

impl BookLevel {
    pub fn price(&self) -> Decimal {
        self.0
    }
}

/// Response from the order book depth endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderBookResponse {
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

impl OrderBookResponse {
    /// Book with the given ask prices (quantity 1 each). Test helper.
    pub fn with_asks(prices: &[Decimal]) -> Self {
        Self {
            asks: prices.iter().map(|p| BookLevel(*p, Decimal::ONE)).collect(),
        }
    }

    /// Best ask: the first ask entry, if it carries a positive price.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks
            .first()
            .map(|level| Price::new(level.price()))
            .filter(Price::is_positive)
    }
}

/// Response from the order endpoint.
///
/// On rejection the exchange answers `{code, msg}` with no `orderId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default, deserialize_with = "lenient_id")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub executed_qty: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    /// Quote spent so far (the exchange's spelling).
    #[serde(
        default,
        rename = "cummulativeQuoteQty",
        deserialize_with = "lenient_decimal"
    )]
    pub cumulative_quote_qty: Option<Decimal>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl OrderResponse {
    /// Accepted order with the given executed quantity and price.
    pub fn filled(order_id: impl Into<String>, executed_qty: Decimal, price: Decimal) -> Self {
        Self {
            order_id: Some(order_id.into()),
            executed_qty: Some(executed_qty),
            price: Some(price),
            ..Self::default()
        }
    }

    /// Accepted order that executed nothing.
    pub fn no_fill(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            executed_qty: Some(Decimal::ZERO),
            ..Self::default()
        }
    }

    /// Exchange rejection.
    pub fn rejected(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Executed quantity, zero when absent.
    pub fn executed(&self) -> Decimal {
        self.executed_qty.unwrap_or(Decimal::ZERO)
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_decimal(&s),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_server_time() {
        let resp: ServerTimeResponse =
            serde_json::from_str(r#"{"serverTime":1752058800123}"#).unwrap();
        assert_eq!(resp.server_time, 1_752_058_800_123);
    }

    #[test]
    fn test_parse_depth_best_ask() {
        let body = r#"{"lastUpdateId":1,"bids":[["99.5","3"]],"asks":[["100.00000000","2.5"],["100.1","1"]]}"#;
        let book: OrderBookResponse = serde_json::from_str(body).unwrap();
        assert_eq!(book.best_ask(), Some(Price::new(dec!(100))));
    }

    #[test]
    fn test_empty_asks_have_no_best_ask() {
        let book: OrderBookResponse = serde_json::from_str(r#"{"asks":[],"bids":[]}"#).unwrap();
        assert_eq!(book.best_ask(), None);

        let missing: OrderBookResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.best_ask(), None);
    }

    #[test]
    fn test_order_response_string_fields() {
        let body = r#"{"symbol":"NEWUSDT","orderId":"C02__123","price":"120.14814815","executedQty":"0.016646","cummulativeQuoteQty":"1.99"}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.order_id.as_deref(), Some("C02__123"));
        assert_eq!(resp.executed(), dec!(0.016646));
        assert_eq!(resp.cumulative_quote_qty, Some(dec!(1.99)));
    }

    #[test]
    fn test_order_response_numeric_fields() {
        let body = r#"{"orderId":987654,"executedQty":0.5,"price":0}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.order_id.as_deref(), Some("987654"));
        assert_eq!(resp.executed(), dec!(0.5));
        assert_eq!(resp.price, Some(Decimal::ZERO));
    }

    #[test]
    fn test_order_response_rejection() {
        let body = r#"{"code":30001,"msg":"Order type not allowed"}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        assert!(resp.order_id.is_none());
        assert_eq!(resp.executed(), Decimal::ZERO);
        assert_eq!(resp.msg.as_deref(), Some("Order type not allowed"));
    }

    #[test]
    fn test_order_response_tolerates_empty_strings() {
        let body = r#"{"orderId":"1","executedQty":"","price":null}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.executed_qty, None);
        assert_eq!(resp.price, None);
    }
}
