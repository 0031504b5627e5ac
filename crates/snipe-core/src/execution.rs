//! Execution result types.
//!
//! This module provides types for:
//! - Classifying a single sent order (`AttemptStatus`)
//! - The immutable record of one attempt (`AttemptOutcome`)
//! - The aggregate of a race (`RaceResult`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Size};
use crate::order::OrderSide;

// ============================================================================
// AttemptStatus
// ============================================================================

/// Classification of an exchange response to one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// Order accepted with executed quantity > 0.
    Filled,
    /// Order accepted (order id present) but nothing executed.
    NoFill,
    /// No order id, transport failure, or unparseable response.
    Error,
}

impl AttemptStatus {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filled => write!(f, "FILLED"),
            Self::NoFill => write!(f, "NO_FILL"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

// ============================================================================
// AttemptOutcome
// ============================================================================

/// Record of one sent order. Read-only once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// 1-based position in the attempt schedule (send order).
    pub index: usize,
    /// Scheduled offset from T0 in ms; `None` for orders outside the race.
    pub offset_ms: Option<i64>,
    pub side: OrderSide,
    /// Wall-clock instant the request left.
    pub sent_at: DateTime<Utc>,
    /// Wall-clock instant the response (or failure) arrived.
    pub received_at: DateTime<Utc>,
    /// Round-trip latency in milliseconds.
    pub latency_ms: f64,
    pub status: AttemptStatus,
    pub executed_qty: Size,
    /// Effective price, when one can be determined.
    pub price: Option<Price>,
    /// Exchange order id, when the order was accepted.
    pub order_id: Option<String>,
    /// Exchange message or local error text.
    pub message: String,
}

impl AttemptOutcome {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status.is_filled()
    }
}

// ============================================================================
// RaceResult
// ============================================================================

/// Complete log of a race plus its winner.
///
/// Outcomes are ordered by scheduled offset (send order), not completion
/// order, so the winner is deterministic when several attempts filled.
/// Equal offsets fall back to the schedule index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    outcomes: Vec<AttemptOutcome>,
    /// Attempts that observed the success flag and never sent.
    skipped: usize,
}

impl RaceResult {
    /// Build from outcomes in any order.
    #[must_use]
    pub fn new(mut outcomes: Vec<AttemptOutcome>, skipped: usize) -> Self {
        outcomes.sort_by_key(|o| (o.offset_ms, o.index));
        Self { outcomes, skipped }
    }

    pub fn outcomes(&self) -> &[AttemptOutcome] {
        &self.outcomes
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// First FILLED outcome by send order.
    pub fn winner(&self) -> Option<&AttemptOutcome> {
        self.outcomes.iter().find(|o| o.is_filled())
    }

    /// Number of FILLED outcomes. More than one means the flag lost a race
    /// against requests already in flight.
    pub fn fill_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_filled()).count()
    }
}
