//! Exchange API trait.
//!
//! Abstracts the three REST calls the engine makes so that the timing and
//! racing logic can be tested against a scripted exchange.

use std::pin::Pin;
use std::sync::Arc;

use crate::error::RestResult;
use crate::responses::{OrderBookResponse, OrderResponse};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Fully stamped and signed order parameters, in wire order.
///
/// The signature is always the last pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    pairs: Vec<(String, String)>,
}

impl SignedQuery {
    /// Create from parameter pairs that already include `signature`.
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Look up a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// `k=v&k=v...` rendering, for logging.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// The exchange endpoints the engine consumes.
///
/// Implementations must be cheap to share across the racing tasks.
pub trait ExchangeApi: Send + Sync {
    /// `GET` server time, in exchange epoch milliseconds. Unauthenticated.
    fn server_time(&self) -> BoxFuture<'_, RestResult<i64>>;

    /// `GET` order book depth for `symbol`. Unauthenticated.
    fn order_book<'a>(
        &'a self,
        symbol: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, RestResult<OrderBookResponse>>;

    /// `POST` a signed order.
    ///
    /// Exchange-level rejections that come back with a JSON body are
    /// returned as `Ok` so the caller can classify them; only transport and
    /// parse failures are `Err`.
    fn place_order(&self, query: SignedQuery) -> BoxFuture<'_, RestResult<OrderResponse>>;
}

/// Arc wrapper for ExchangeApi trait objects.
pub type DynExchange = Arc<dyn ExchangeApi>;
