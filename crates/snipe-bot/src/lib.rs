//! Listing sniper.
//!
//! Wires the execution engine to configuration and the exchange:
//! - TOML application config and JSON listing records
//! - `Engine`: one timed run against a listing instant
//! - `Application`: single runs and multi-listing schedules

pub mod app;
pub mod config;
pub mod engine;
pub mod error;

pub use app::{plan_schedule, Application, ScheduleSummary, ScheduledRun};
pub use config::{AppConfig, ListingRecord};
pub use engine::{Engine, EngineSettings, RunReport, RunVerdict};
pub use error::{AppError, AppResult};
