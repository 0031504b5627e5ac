//! Post-race stagnation check.
//!
//! After a LIMIT race with no fill, the top-of-book ask is sampled at a
//! fixed cadence. An ask that never moves suggests the listing has not
//! really opened yet and a later retry may be worthwhile; any movement
//! means the opportunity has passed. This is a heuristic.
//!
//! The retry is advisory: the verdict carries a recommended instant, and
//! nothing re-arms the engine.

use chrono::{DateTime, Utc};
use snipe_core::Price;
use snipe_rest::DynExchange;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{utc_from_us, DynClock};

/// Sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagnationConfig {
    pub poll_interval: Duration,
    pub samples: usize,
    /// Delay from the verdict to the recommended retry.
    pub retry_after: Duration,
}

impl Default for StagnationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            samples: 6,
            retry_after: Duration::from_secs(600),
        }
    }
}

/// Outcome of an observation window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagnationVerdict {
    /// The ask never changed; a retry near `retry_at` is recommended.
    Stagnant {
        ask: Option<Price>,
        retry_at: DateTime<Utc>,
    },
    /// The ask changed at `sample` (1-based); abandon.
    Moved {
        sample: usize,
        from: Option<Price>,
        to: Option<Price>,
    },
    /// No sample could be fetched.
    Inconclusive,
}

impl StagnationVerdict {
    pub fn is_stagnant(&self) -> bool {
        matches!(self, Self::Stagnant { .. })
    }
}

/// Polls the best ask after an unfilled race.
pub struct StagnationDetector {
    api: DynExchange,
    clock: DynClock,
    config: StagnationConfig,
    book_limit: u32,
}

impl StagnationDetector {
    pub fn new(api: DynExchange, clock: DynClock, config: StagnationConfig, book_limit: u32) -> Self {
        Self {
            api,
            clock,
            config,
            book_limit,
        }
    }

    /// Sample the ask up to `samples` times, one `poll_interval` apart,
    /// returning as soon as it moves.
    ///
    /// Failed fetches are skipped; they neither confirm nor break
    /// stagnation.
    pub async fn observe(&self, symbol: &str) -> StagnationVerdict {
        let mut reference: Option<Option<Price>> = None;

        for sample in 1..=self.config.samples {
            self.clock.sleep(self.config.poll_interval).await;

            let ask = match self.api.order_book(symbol, self.book_limit).await {
                Ok(book) => book.best_ask(),
                Err(e) => {
                    warn!(symbol, sample, error = %e, "Stagnation sample failed");
                    continue;
                }
            };
            debug!(symbol, sample, ask = ?ask, "Stagnation sample");

            match reference {
                None => reference = Some(ask),
                Some(first) if first != ask => {
                    info!(symbol, sample, from = ?first, to = ?ask, "Best ask moved");
                    return StagnationVerdict::Moved {
                        sample,
                        from: first,
                        to: ask,
                    };
                }
                Some(_) => {}
            }
        }

        match reference {
            Some(ask) => {
                let retry_us = self.clock.now_us() + self.config.retry_after.as_micros() as i64;
                StagnationVerdict::Stagnant {
                    ask,
                    retry_at: utc_from_us(retry_us),
                }
            }
            None => StagnationVerdict::Inconclusive,
        }
    }
}
