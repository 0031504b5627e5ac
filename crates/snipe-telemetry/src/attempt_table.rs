//! Plain-text attempt table.

use chrono::{DateTime, Utc};
use snipe_core::AttemptOutcome;
use std::fmt::Write;

const HEADER: [&str; 9] = [
    "#", "side", "sent", "received", "latency_ms", "status", "executed_qty", "price", "message",
];

/// Longest exchange message kept in a cell.
const MAX_MESSAGE_CHARS: usize = 60;

fn time_cell(ts: DateTime<Utc>) -> String {
    ts.format("%H:%M:%S%.3f").to_string()
}

fn message_cell(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

fn row(outcome: &AttemptOutcome) -> [String; 9] {
    [
        outcome.index.to_string(),
        outcome.side.to_string(),
        time_cell(outcome.sent_at),
        time_cell(outcome.received_at),
        format!("{:.3}", outcome.latency_ms),
        outcome.status.to_string(),
        outcome.executed_qty.to_string(),
        outcome
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        message_cell(&outcome.message),
    ]
}

/// Render outcomes as an aligned table, one line per attempt, in the order
/// given.
pub fn render_attempt_table(outcomes: &[AttemptOutcome]) -> String {
    let rows: Vec<[String; 9]> = outcomes.iter().map(row).collect();

    let mut widths = HEADER.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_line = |cells: &[&str]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = writeln!(out, "{}", line.trim_end());
    };

    push_line(&HEADER);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&rule.iter().map(String::as_str).collect::<Vec<_>>());
    for cells in &rows {
        push_line(&cells.iter().map(String::as_str).collect::<Vec<_>>());
    }

    if outcomes.is_empty() {
        out.push_str("(no orders sent)\n");
    }
    out
}
