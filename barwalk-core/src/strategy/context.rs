use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account snapshot handed to the strategy at each decision bar.
///
/// Marked at the decision bar's close. Built fresh for every call and not
/// retained by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub now: DateTime<Utc>,
    pub position_qty: f64,
    pub position_avg_price: Option<f64>,
    pub cash: f64,
    pub equity: f64,
    pub last_price: f64,
    pub last_fill_ts: Option<DateTime<Utc>>,
    pub last_fill_price: Option<f64>,
}

impl Context {
    /// Current position value as a fraction of equity (0 when equity is not positive).
    pub fn position_weight(&self) -> f64 {
        if self.equity > 0.0 {
            self.position_qty * self.last_price / self.equity
        } else {
            0.0
        }
    }

    pub fn has_position(&self) -> bool {
        self.position_qty > 0.0
    }
}
