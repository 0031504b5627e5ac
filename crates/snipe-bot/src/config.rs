//! Application configuration and listing records.
//!
//! Two inputs:
//! - `AppConfig`: TOML, exchange endpoints and engine tuning.
//! - `ListingRecord`: JSON, one target listing with its account credentials.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use snipe_core::{Credentials, ListingTarget};
use snipe_executor::StagnationConfig;
use snipe_rest::RestConfig;
use std::fmt;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// AppConfig
// ============================================================================

/// Exchange endpoint layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub server_time_path: String,
    pub order_book_path: String,
    pub order_path: String,
    /// Header carrying the API key.
    pub api_key_header: String,
    /// Local timeout for each HTTP call (ms).
    pub request_timeout_ms: u64,
    /// Depth requested from the order book endpoint.
    pub order_book_limit: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        let rest = RestConfig::default();
        Self {
            base_url: rest.base_url,
            server_time_path: rest.server_time_path,
            order_book_path: rest.order_book_path,
            order_path: rest.order_path,
            api_key_header: rest.api_key_header,
            request_timeout_ms: rest.request_timeout.as_millis() as u64,
            order_book_limit: 5,
        }
    }
}

impl ExchangeConfig {
    pub fn rest_config(&self) -> RestConfig {
        RestConfig {
            base_url: self.base_url.clone(),
            server_time_path: self.server_time_path.clone(),
            order_book_path: self.order_book_path.clone(),
            order_path: self.order_path.clone(),
            api_key_header: self.api_key_header.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Race schedule and timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Attempt offsets relative to T0 (ms). Attempts are numbered by position
    /// and fire in offset order.
    #[serde(default = "default_attempt_offsets_ms")]
    pub attempt_offsets_ms: Vec<i64>,
    /// Exchange receive window for race and sell orders (ms).
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// Remaining time below which the scheduler spins instead of sleeping (µs).
    #[serde(default = "default_spin_threshold_us")]
    pub spin_threshold_us: u64,
    /// Warmup and price preparation start this long before T0 (ms).
    #[serde(default = "default_prepare_lead_ms")]
    pub prepare_lead_ms: u64,
    /// Send the backdated warmup order after clock sync.
    #[serde(default = "default_warmup")]
    pub warmup: bool,
    /// `schedule` starts each listing's run this long before its T0 (s).
    #[serde(default = "default_schedule_lead_secs")]
    pub schedule_lead_secs: u64,
}

fn default_attempt_offsets_ms() -> Vec<i64> {
    vec![-10, -5, 0]
}

fn default_recv_window_ms() -> u64 {
    5_000
}

fn default_spin_threshold_us() -> u64 {
    5_000
}

fn default_prepare_lead_ms() -> u64 {
    3_000
}

fn default_warmup() -> bool {
    true
}

fn default_schedule_lead_secs() -> u64 {
    10
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            attempt_offsets_ms: default_attempt_offsets_ms(),
            recv_window_ms: default_recv_window_ms(),
            spin_threshold_us: default_spin_threshold_us(),
            prepare_lead_ms: default_prepare_lead_ms(),
            warmup: default_warmup(),
            schedule_lead_secs: default_schedule_lead_secs(),
        }
    }
}

/// Post-race stagnation sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagnationSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_samples() -> usize {
    6
}

fn default_retry_after_secs() -> u64 {
    600
}

impl Default for StagnationSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            samples: default_samples(),
            retry_after_secs: default_retry_after_secs(),
        }
    }
}

impl StagnationSettings {
    pub fn detector_config(&self) -> StagnationConfig {
        StagnationConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            samples: self.samples,
            retry_after: Duration::from_secs(self.retry_after_secs),
        }
    }
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Level or full filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub stagnation: StagnationSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.execution.attempt_offsets_ms.is_empty() {
            return Err(AppError::Config(
                "execution.attempt_offsets_ms must not be empty".to_string(),
            ));
        }
        let mut offsets = self.execution.attempt_offsets_ms.clone();
        offsets.sort_unstable();
        if offsets.windows(2).any(|w| w[0] == w[1]) {
            return Err(AppError::Config(
                "execution.attempt_offsets_ms must not repeat an offset".to_string(),
            ));
        }
        if self.exchange.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "exchange.request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.exchange.base_url.trim().is_empty() {
            return Err(AppError::Config("exchange.base_url is empty".to_string()));
        }
        if self.stagnation.samples == 0 {
            return Err(AppError::Config(
                "stagnation.samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ListingRecord
// ============================================================================

fn default_price_markup_pct() -> Decimal {
    Decimal::from(20)
}

fn default_profit_pct() -> Decimal {
    Decimal::from(200)
}

/// One listing entry as written in the listing JSON.
#[derive(Clone, Deserialize)]
pub struct ListingRecord {
    /// Optional label, used in logs.
    #[serde(default)]
    pub id: Option<String>,
    pub api_key: String,
    pub api_secret: String,
    pub symbol: String,
    pub quote_amount: Decimal,
    /// ISO-8601 / RFC 3339; a value without offset is read as UTC.
    pub listing_time: String,
    #[serde(default = "default_price_markup_pct")]
    pub price_markup_pct: Decimal,
    #[serde(default = "default_profit_pct")]
    pub profit_pct: Decimal,
}

impl fmt::Debug for ListingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingRecord")
            .field("id", &self.id)
            .field("symbol", &self.symbol)
            .field("quote_amount", &self.quote_amount)
            .field("listing_time", &self.listing_time)
            .field("price_markup_pct", &self.price_markup_pct)
            .field("profit_pct", &self.profit_pct)
            .finish_non_exhaustive()
    }
}

/// Parse a listing instant into UTC.
pub fn parse_listing_time(value: &str) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::Config(format!("Invalid listing_time: {value:?}")))
}

impl ListingRecord {
    /// Label for logs: the id if present, else the symbol.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.symbol)
    }

    /// Validate into engine inputs. The secret moves into a zeroizing buffer.
    pub fn into_parts(self) -> AppResult<(ListingTarget, Credentials)> {
        let t0 = parse_listing_time(&self.listing_time)?;
        let target = ListingTarget::new(
            &self.symbol,
            self.quote_amount,
            t0,
            self.price_markup_pct,
            self.profit_pct,
        )?;
        let credentials = Credentials::new(self.api_key, self.api_secret)?;
        Ok((target, credentials))
    }

    /// Read a single listing object.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = read_listing_file(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse listing: {e}")))
    }

    /// Read a JSON array of listings.
    pub fn list_from_file(path: impl AsRef<Path>) -> AppResult<Vec<Self>> {
        let content = read_listing_file(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse listings: {e}")))
    }
}

fn read_listing_file(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read listing file {}: {e}", path.display()))
    })
}
