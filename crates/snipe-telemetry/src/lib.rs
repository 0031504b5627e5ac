//! Structured logging and attempt reporting.
//!
//! - `tracing` subscriber setup (JSON in production, pretty otherwise)
//! - Plain-text rendering of the attempt log

pub mod attempt_table;
pub mod error;
pub mod logging;

pub use attempt_table::render_attempt_table;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
