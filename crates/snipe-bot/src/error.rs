//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid listing: {0}")]
    Listing(#[from] snipe_core::CoreError),

    #[error("REST error: {0}")]
    Rest(#[from] snipe_rest::RestError),

    #[error("Executor error: {0}")]
    Executor(#[from] snipe_executor::ExecutorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] snipe_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
