//! Application wiring: single runs and the listing schedule.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use snipe_core::{Credentials, ListingTarget};
use snipe_executor::SystemClock;
use snipe_rest::RestClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ListingRecord};
use crate::engine::{Engine, EngineSettings, RunReport, RunVerdict};
use crate::error::AppResult;

/// A listing accepted into the schedule.
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub label: String,
    pub target: ListingTarget,
    pub credentials: Credentials,
    /// Local instant at which the run starts.
    pub start_at: DateTime<Utc>,
}

/// Split listings into future runs and skipped past ones.
///
/// Every record is validated first; one invalid record fails the whole
/// schedule before any network activity.
pub fn plan_schedule(
    records: Vec<ListingRecord>,
    now: DateTime<Utc>,
    lead: Duration,
) -> AppResult<(Vec<ScheduledRun>, Vec<String>)> {
    let lead = chrono::Duration::from_std(lead).unwrap_or_else(|_| chrono::Duration::zero());

    let mut parsed = Vec::with_capacity(records.len());
    for record in records {
        let label = record.label().to_string();
        let (target, credentials) = record.into_parts()?;
        parsed.push((label, target, credentials));
    }

    let mut runs = Vec::new();
    let mut skipped = Vec::new();
    for (label, target, credentials) in parsed {
        if target.t0() <= now {
            skipped.push(label);
            continue;
        }
        let start_at = (target.t0() - lead).max(now);
        runs.push(ScheduledRun {
            label,
            target,
            credentials,
            start_at,
        });
    }
    runs.sort_by_key(|run| run.start_at);
    Ok((runs, skipped))
}

/// Outcome counts for a schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub bought: usize,
    pub not_bought: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run a single listing now. The engine itself waits for T0.
    pub async fn run_listing(&self, record: ListingRecord) -> AppResult<RunReport> {
        let (target, credentials) = record.into_parts()?;
        run_target(&self.config, &target, &credentials).await
    }

    /// Run every future listing, each on its own task, starting
    /// `schedule_lead_secs` before its T0.
    pub async fn run_schedule(&self, records: Vec<ListingRecord>) -> AppResult<ScheduleSummary> {
        let lead = Duration::from_secs(self.config.execution.schedule_lead_secs);
        let (runs, skipped) = plan_schedule(records, Utc::now(), lead)?;

        for label in &skipped {
            warn!(listing = %label, "Listing time already passed, skipping");
        }
        info!(scheduled = runs.len(), skipped = skipped.len(), "Schedule loaded");

        let config = Arc::new(self.config.clone());
        let handles: Vec<_> = runs
            .into_iter()
            .map(|run| {
                let config = config.clone();
                tokio::spawn(async move {
                    let wait = (run.start_at - Utc::now()).to_std().unwrap_or_default();
                    info!(
                        listing = %run.label,
                        start_at = %run.start_at,
                        wait_secs = wait.as_secs(),
                        "Listing scheduled"
                    );
                    tokio::time::sleep(wait).await;

                    let result = run_target(&config, &run.target, &run.credentials).await;
                    if let Err(e) = &result {
                        error!(listing = %run.label, error = %e, "Run failed");
                    }
                    result
                })
            })
            .collect();

        let mut summary = ScheduleSummary {
            skipped: skipped.len(),
            ..ScheduleSummary::default()
        };
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(report)) if matches!(report.verdict, RunVerdict::Bought { .. }) => {
                    summary.bought += 1
                }
                Ok(Ok(_)) => summary.not_bought += 1,
                Ok(Err(_)) => summary.failed += 1,
                Err(e) => {
                    error!(error = %e, "Run task aborted");
                    summary.failed += 1;
                }
            }
        }

        info!(
            bought = summary.bought,
            not_bought = summary.not_bought,
            failed = summary.failed,
            skipped = summary.skipped,
            "Schedule finished"
        );
        Ok(summary)
    }
}

/// Build the production engine for one account and run it.
async fn run_target(
    config: &AppConfig,
    target: &ListingTarget,
    credentials: &Credentials,
) -> AppResult<RunReport> {
    let client = RestClient::new(config.exchange.rest_config(), credentials.api_key())?;
    let engine = Engine::new(
        Arc::new(client),
        Arc::new(SystemClock),
        EngineSettings::from(config),
    );
    engine.run(target, credentials).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(symbol: &str, listing_time: &str) -> ListingRecord {
        serde_json::from_value(serde_json::json!({
            "api_key": "key",
            "api_secret": "secret",
            "symbol": symbol,
            "quote_amount": "5",
            "listing_time": listing_time,
        }))
        .unwrap()
    }

    #[test]
    fn test_plan_skips_past_listings_and_orders_by_start() {
        let now = Utc.with_ymd_and_hms(2025, 7, 9, 10, 0, 0).unwrap();
        let records = vec![
            record("LATEUSDT", "2025-07-09T12:00:00Z"),
            record("PASTUSDT", "2025-07-09T09:00:00Z"),
            record("SOONUSDT", "2025-07-09T11:00:00Z"),
        ];

        let (runs, skipped) = plan_schedule(records, now, Duration::from_secs(10)).unwrap();

        assert_eq!(skipped, vec!["PASTUSDT".to_string()]);
        let symbols: Vec<_> = runs.iter().map(|r| r.target.symbol()).collect();
        assert_eq!(symbols, vec!["SOONUSDT", "LATEUSDT"]);
        assert_eq!(
            runs[0].start_at,
            Utc.with_ymd_and_hms(2025, 7, 9, 10, 59, 50).unwrap()
        );
    }

    #[test]
    fn test_plan_starts_imminent_listing_now() {
        let now = Utc.with_ymd_and_hms(2025, 7, 9, 10, 59, 55).unwrap();
        let (runs, _) = plan_schedule(
            vec![record("SOONUSDT", "2025-07-09T11:00:00Z")],
            now,
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(runs[0].start_at, now);
    }

    #[test]
    fn test_plan_rejects_invalid_record() {
        let now = Utc.with_ymd_and_hms(2025, 7, 9, 10, 0, 0).unwrap();
        let result = plan_schedule(
            vec![record("OKUSDT", "2025-07-09T12:00:00Z"), record("BAD", "not a time")],
            now,
            Duration::from_secs(10),
        );
        assert!(result.is_err());
    }
}
