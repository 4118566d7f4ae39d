//! In-memory bar construction helpers and the bar quality scan.
//!
//! Loading bars from files lives in the runner; these helpers build bar
//! tables from plain numbers for tests, benches and offline runs.

pub mod qc;
pub mod synthetic;

pub use qc::BarQc;
pub use synthetic::SyntheticBars;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::Bar;

/// Default start of generated series: 2024-01-01T00:00:00Z.
pub fn default_start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or_default()
}

/// Daily bars from closes. Each bar opens at the previous close (the first
/// at its own close); high/low straddle open and close by 1%.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    bars_from_closes_at(closes, default_start(), Duration::days(1))
}

pub fn bars_from_closes_at(closes: &[f64], start: DateTime<Utc>, step: Duration) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + step * i as i32,
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

/// Daily bars from explicit (open, close) pairs.
pub fn bars_from_open_close(prices: &[(f64, f64)]) -> Vec<Bar> {
    let start = default_start();
    prices
        .iter()
        .enumerate()
        .map(|(i, &(open, close))| Bar {
            timestamp: start + Duration::days(i as i64),
            open,
            high: open.max(close) * 1.01,
            low: open.min(close) * 0.99,
            close,
            volume: 1_000.0,
        })
        .collect()
}
