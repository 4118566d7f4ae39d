use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mark-to-market equity at one bar. One point per simulated bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, equity: f64) -> Self {
        Self { timestamp, equity }
    }
}

/// Extract the raw equity values from a series, in order.
pub fn equity_values(series: &[EquityPoint]) -> Vec<f64> {
    series.iter().map(|p| p.equity).collect()
}
