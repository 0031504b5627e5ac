//! Scripted in-memory exchange for tests.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::api::{BoxFuture, ExchangeApi, SignedQuery};
use crate::error::{RestError, RestResult};
use crate::responses::{OrderBookResponse, OrderResponse};

/// Mock exchange implementing [`ExchangeApi`].
///
/// - Server time is a fixed value (or an error if never set).
/// - Order book responses are served from a queue; the last one repeats.
/// - Order responses are served from a queue; once empty, orders are
///   rejected.
/// - Every order query is recorded.
#[derive(Debug, Default)]
pub struct MockExchange {
    server_time: Mutex<Option<RestResult<i64>>>,
    books: Mutex<VecDeque<RestResult<OrderBookResponse>>>,
    orders: Mutex<VecDeque<RestResult<OrderResponse>>>,
    order_delay: Mutex<Option<Duration>>,
    received: Mutex<Vec<SignedQuery>>,
    server_time_calls: AtomicUsize,
    book_calls: AtomicUsize,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_server_time(&self, ms: i64) {
        *self.server_time.lock() = Some(Ok(ms));
    }

    pub fn fail_server_time(&self, err: RestError) {
        *self.server_time.lock() = Some(Err(err));
    }

    pub fn push_book(&self, book: OrderBookResponse) {
        self.books.lock().push_back(Ok(book));
    }

    pub fn push_book_error(&self, err: RestError) {
        self.books.lock().push_back(Err(err));
    }

    pub fn push_order_response(&self, response: OrderResponse) {
        self.orders.lock().push_back(Ok(response));
    }

    pub fn push_order_error(&self, err: RestError) {
        self.orders.lock().push_back(Err(err));
    }

    /// Delay every order response by `delay` (simulated network latency).
    pub fn set_order_delay(&self, delay: Duration) {
        *self.order_delay.lock() = Some(delay);
    }

    /// Every order query received, in arrival order.
    pub fn received_orders(&self) -> Vec<SignedQuery> {
        self.received.lock().clone()
    }

    pub fn order_count(&self) -> usize {
        self.received.lock().len()
    }

    pub fn server_time_calls(&self) -> usize {
        self.server_time_calls.load(Ordering::SeqCst)
    }

    pub fn book_calls(&self) -> usize {
        self.book_calls.load(Ordering::SeqCst)
    }
}

impl ExchangeApi for MockExchange {
    fn server_time(&self) -> BoxFuture<'_, RestResult<i64>> {
        Box::pin(async move {
            self.server_time_calls.fetch_add(1, Ordering::SeqCst);
            self.server_time
                .lock()
                .clone()
                .unwrap_or_else(|| Err(RestError::Transport("server time not scripted".into())))
        })
    }

    fn order_book<'a>(
        &'a self,
        _symbol: &'a str,
        _limit: u32,
    ) -> BoxFuture<'a, RestResult<OrderBookResponse>> {
        Box::pin(async move {
            self.book_calls.fetch_add(1, Ordering::SeqCst);
            let mut books = self.books.lock();
            if books.len() > 1 {
                books
                    .pop_front()
                    .unwrap_or_else(|| Ok(OrderBookResponse::default()))
            } else {
                books
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Ok(OrderBookResponse::default()))
            }
        })
    }

    fn place_order(&self, query: SignedQuery) -> BoxFuture<'_, RestResult<OrderResponse>> {
        Box::pin(async move {
            self.received.lock().push(query);
            let response = self
                .orders
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(OrderResponse::rejected(-1, "no scripted response")));

            let delay = *self.order_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_last_book_repeats() {
        let mock = MockExchange::new();
        mock.push_book(OrderBookResponse::with_asks(&[dec!(1)]));
        mock.push_book(OrderBookResponse::with_asks(&[dec!(2)]));

        let first = mock.order_book("X", 5).await.unwrap();
        let second = mock.order_book("X", 5).await.unwrap();
        let third = mock.order_book("X", 5).await.unwrap();

        assert_eq!(first.best_ask().map(|p| p.inner()), Some(dec!(1)));
        assert_eq!(second.best_ask().map(|p| p.inner()), Some(dec!(2)));
        assert_eq!(third.best_ask().map(|p| p.inner()), Some(dec!(2)));
        assert_eq!(mock.book_calls(), 3);
    }

    #[tokio::test]
    async fn test_orders_are_recorded_and_default_to_rejection() {
        let mock = MockExchange::new();
        mock.push_order_response(OrderResponse::no_fill("1"));

        let q = SignedQuery::new(vec![("symbol".into(), "X".into())]);
        let first = mock.place_order(q.clone()).await.unwrap();
        let second = mock.place_order(q).await.unwrap();

        assert_eq!(first.order_id.as_deref(), Some("1"));
        assert!(second.order_id.is_none());
        assert_eq!(mock.order_count(), 2);
    }

    #[tokio::test]
    async fn test_unscripted_server_time_fails() {
        let mock = MockExchange::new();
        assert!(mock.server_time().await.is_err());
        mock.set_server_time(42);
        assert_eq!(mock.server_time().await.unwrap(), 42);
        assert_eq!(mock.server_time_calls(), 2);
    }
}
