//! Exchange REST collaborator for the snipe engine.
//!
//! The engine only needs three endpoints: server time, order book depth,
//! and order placement. They sit behind the [`ExchangeApi`] trait so the
//! executor can be driven by [`RestClient`] in production and by
//! [`MockExchange`] in tests.

pub mod api;
pub mod client;
pub mod error;
pub mod mock;
pub mod responses;

pub use api::{BoxFuture, DynExchange, ExchangeApi, SignedQuery};
pub use client::{RestClient, RestConfig};
pub use error::{RestError, RestResult};
pub use mock::MockExchange;
pub use responses::{BookLevel, OrderBookResponse, OrderResponse, ServerTimeResponse};
