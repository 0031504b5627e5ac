//! Error types for snipe-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid listing: {0}")]
    InvalidListing(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
