use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// One executed fill, appended to the run's ledger.
///
/// `cash` and `equity` are the account values right after the fill, with
/// equity marked at the fill's price basis (the bar open, or the final close
/// for end-of-run liquidation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub quantity: f64,
    /// Execution price including slippage.
    pub price: f64,
    pub notional: f64,
    pub fee: f64,
    pub cash: f64,
    pub equity: f64,
    pub weight_pre: f64,
    pub weight_post: f64,
    pub target_weight: f64,
}
