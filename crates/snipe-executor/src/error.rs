//! Executor error types.
//!
//! Only run-fatal conditions are errors. A failed race attempt is recorded
//! as an `AttemptStatus::Error` outcome instead.

use snipe_rest::RestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Clock synchronization failed: {0}")]
    ClockSync(#[source] RestError),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Invalid attempt schedule: {0}")]
    InvalidSchedule(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
