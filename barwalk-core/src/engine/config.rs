use serde::{Deserialize, Serialize};

use super::cost_model::CostModel;
use crate::error::ConfigError;
use crate::metrics::Resolution;

/// Configuration for a single simulation run, assembled by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_cash: f64,
    pub cost: CostModel,
    /// Bar resolution, used to annualize the Sharpe ratio.
    pub resolution: Resolution,
    /// Upper bound on the target weight (no leverage beyond this).
    pub weight_cap: f64,
    /// Sell any remaining position at the final close.
    pub liquidate_on_end: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            cost: CostModel::frictionless(),
            resolution: Resolution::D1,
            weight_cap: 1.0,
            liquidate_on_end: true,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_cash: f64, cost: CostModel, resolution: Resolution) -> Self {
        Self {
            initial_cash,
            cost,
            resolution,
            ..Self::default()
        }
    }

    pub fn with_liquidation(mut self, liquidate_on_end: bool) -> Self {
        self.liquidate_on_end = liquidate_on_end;
        self
    }

    pub fn with_weight_cap(mut self, weight_cap: f64) -> Self {
        self.weight_cap = weight_cap;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(ConfigError::InvalidInitialCash(self.initial_cash));
        }
        if !(self.weight_cap > 0.0 && self.weight_cap <= 1.0) {
            return Err(ConfigError::InvalidWeightCap(self.weight_cap));
        }
        self.cost.validate()
    }
}
