//! Run orchestration.
//!
//! One run: clock sync → preparation wait → warmup → price → race →
//! take-profit or stagnation check. Every run ends with exactly one
//! terminal log line.

use chrono::{DateTime, Utc};
use snipe_core::{AttemptOutcome, Credentials, ListingTarget, Price, RaceResult};
use snipe_executor::{
    synchronize, AttemptRacer, ClockOffset, DynClock, FollowUp, FollowUpReport, OrderClient,
    OrderMode, PriceStrategy, Scheduler, Signer, StagnationConfig, StagnationDetector,
    StagnationVerdict,
};
use snipe_rest::DynExchange;
use snipe_telemetry::render_attempt_table;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Engine tuning, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub attempt_offsets_ms: Vec<i64>,
    pub recv_window_ms: u64,
    pub spin_threshold: Duration,
    pub prepare_lead_ms: u64,
    pub warmup: bool,
    pub order_book_limit: u32,
    pub stagnation: StagnationConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            attempt_offsets_ms: config.execution.attempt_offsets_ms.clone(),
            recv_window_ms: config.execution.recv_window_ms,
            spin_threshold: Duration::from_micros(config.execution.spin_threshold_us),
            prepare_lead_ms: config.execution.prepare_lead_ms,
            warmup: config.execution.warmup,
            order_book_limit: config.exchange.order_book_limit,
            stagnation: config.stagnation.detector_config(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunVerdict {
    /// A race attempt filled; the take-profit result is attached.
    Bought {
        winner: AttemptOutcome,
        follow_up: FollowUpReport,
    },
    /// MARKET race without a fill.
    NoBuy,
    /// LIMIT race without a fill and an unchanged ask. Advisory only.
    RetryRecommended {
        ask: Option<Price>,
        retry_at: DateTime<Utc>,
    },
    /// LIMIT race without a fill and the market moved, or no sample could
    /// be taken.
    Abandoned { reason: String },
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub offset: ClockOffset,
    pub mode: OrderMode,
    pub race: RaceResult,
    pub verdict: RunVerdict,
}

/// Sequences the execution components for one listing.
pub struct Engine {
    api: DynExchange,
    clock: DynClock,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(api: DynExchange, clock: DynClock, settings: EngineSettings) -> Self {
        Self {
            api,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Execute one run against `target`.
    ///
    /// # Errors
    /// Only clock synchronization and setup failures are returned; attempt
    /// failures are part of the report.
    pub async fn run(
        &self,
        target: &ListingTarget,
        credentials: &Credentials,
    ) -> AppResult<RunReport> {
        let symbol = target.symbol();
        let t0_ms = target.t0_ms();
        info!(
            symbol,
            t0 = %target.t0(),
            quote_amount = %target.quote_amount(),
            markup_pct = %target.price_markup_pct(),
            profit_pct = %target.profit_pct(),
            "Run starting"
        );

        // Fatal on failure: no offset means no safe scheduling.
        let offset = synchronize(self.api.as_ref(), self.clock.as_ref()).await?;

        let signer = Signer::from_credentials(credentials)?;
        let scheduler = Arc::new(Scheduler::new(
            self.clock.clone(),
            offset,
            self.settings.spin_threshold,
        ));
        let client = OrderClient::new(self.api.clone(), signer, self.clock.clone(), offset);
        let racer = AttemptRacer::new(
            scheduler.clone(),
            client.clone(),
            self.settings.attempt_offsets_ms.clone(),
        )?;

        let prepare_at_ms = t0_ms - self.settings.prepare_lead_ms as i64;
        let now_ms = scheduler.exchange_now_ms();
        if now_ms < prepare_at_ms {
            debug!(symbol, wait_ms = prepare_at_ms - now_ms, "Waiting for preparation window");
            scheduler.sleep_until(prepare_at_ms).await;
        } else {
            warn!(
                symbol,
                late_ms = now_ms - prepare_at_ms,
                "Preparation window already open"
            );
        }

        if self.settings.warmup {
            client.warmup(symbol).await;
        }

        let best_ask = match self.api.order_book(symbol, self.settings.order_book_limit).await {
            Ok(book) => book.best_ask(),
            Err(e) => {
                warn!(symbol, error = %e, "Order book unavailable");
                None
            }
        };
        let mode = PriceStrategy::new(target.price_markup_pct())
            .resolve(best_ask, target.quote_amount());
        match mode.quote() {
            Some(quote) => info!(
                symbol,
                best_ask = %quote.best_ask,
                limit_price = %quote.limit_price,
                quantity = %quote.quantity,
                "LIMIT mode"
            ),
            None => info!(
                symbol,
                quote_amount = %target.quote_amount(),
                "No usable ask, MARKET mode"
            ),
        }

        let template = mode.intent(symbol, target.quote_amount(), self.settings.recv_window_ms);
        let race = racer.race(t0_ms, &template).await;
        info!(
            symbol,
            mode = mode.label(),
            "Attempt log\n{}",
            render_attempt_table(race.outcomes())
        );

        let verdict = match race.winner() {
            Some(winner) => {
                let follow_up = FollowUp::new(client, target.profit_pct(), self.settings.recv_window_ms)
                    .place(symbol, winner, race.outcomes().len() + 1)
                    .await;
                RunVerdict::Bought {
                    winner: winner.clone(),
                    follow_up,
                }
            }
            None if mode.is_market() => RunVerdict::NoBuy,
            None => {
                let detector = StagnationDetector::new(
                    self.api.clone(),
                    self.clock.clone(),
                    self.settings.stagnation,
                    self.settings.order_book_limit,
                );
                match detector.observe(symbol).await {
                    StagnationVerdict::Stagnant { ask, retry_at } => {
                        RunVerdict::RetryRecommended { ask, retry_at }
                    }
                    StagnationVerdict::Moved { sample, from, to } => RunVerdict::Abandoned {
                        reason: format!(
                            "best ask moved at sample {sample}: {} -> {}",
                            fmt_ask(from),
                            fmt_ask(to)
                        ),
                    },
                    StagnationVerdict::Inconclusive => RunVerdict::Abandoned {
                        reason: "order book unavailable during observation".to_string(),
                    },
                }
            }
        };

        log_verdict(symbol, &verdict);
        Ok(RunReport {
            offset,
            mode,
            race,
            verdict,
        })
    }
}

fn fmt_ask(ask: Option<Price>) -> String {
    ask.map_or_else(|| "none".to_string(), |p| p.to_string())
}

fn log_verdict(symbol: &str, verdict: &RunVerdict) {
    match verdict {
        RunVerdict::Bought {
            winner,
            follow_up: FollowUpReport::Placed(tp, _),
        } => info!(
            symbol,
            attempt = winner.index,
            bought_qty = %winner.executed_qty,
            sell_price = %tp.price,
            sell_qty = %tp.quantity,
            "SELL placed"
        ),
        RunVerdict::Bought { winner, follow_up } => warn!(
            symbol,
            attempt = winner.index,
            bought_qty = %winner.executed_qty,
            sell_failed = matches!(follow_up, FollowUpReport::Failed(..)),
            "Bought, take-profit not placed"
        ),
        RunVerdict::NoBuy => info!(symbol, "No buy"),
        RunVerdict::RetryRecommended { ask, retry_at } => info!(
            symbol,
            ask = %fmt_ask(*ask),
            retry_at = %retry_at,
            "Stagnation detected, retry recommended"
        ),
        RunVerdict::Abandoned { reason } => info!(symbol, reason = %reason, "Abandoned"),
    }
}
