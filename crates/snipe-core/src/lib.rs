//! Core domain types for the listing snipe engine.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Price`, `Size`: Precision-safe numeric types with exchange rounding
//! - `OrderSide`, `OrderType`, `TimeInForce`: Order enums with wire names
//! - `ListingTarget`, `Credentials`: Immutable run inputs
//! - `OrderIntent`: Unsigned order template built once per attempt
//! - `AttemptOutcome`, `RaceResult`: Classified results of sent orders

pub mod decimal;
pub mod error;
pub mod execution;
pub mod listing;
pub mod order;

pub use decimal::{Price, Size, PRICE_DECIMALS, QTY_DECIMALS};
pub use error::{CoreError, Result};
pub use execution::{AttemptOutcome, AttemptStatus, RaceResult};
pub use listing::{Credentials, ListingTarget};
pub use order::{OrderIntent, OrderQuantity, OrderSide, OrderType, TimeInForce};
