//! Cost model: slippage and fee calculation.
//!
//! Slippage is directional: buyers pay more, sellers receive less.
//! Fees are charged on notional, per side, in basis points.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Execution friction in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Fee in basis points of notional, per side.
    pub fee_bps: f64,
    /// Slippage in basis points, applied against the trader.
    pub slippage_bps: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

impl CostModel {
    pub fn new(fee_bps: f64, slippage_bps: f64) -> Self {
        Self {
            fee_bps,
            slippage_bps,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_bps / 10_000.0
    }

    pub fn slippage_rate(&self) -> f64 {
        self.slippage_bps / 10_000.0
    }

    /// Price paid when buying at `raw_price`.
    pub fn buy_price(&self, raw_price: f64) -> f64 {
        raw_price * (1.0 + self.slippage_rate())
    }

    /// Price received when selling at `raw_price`.
    pub fn sell_price(&self, raw_price: f64) -> f64 {
        raw_price * (1.0 - self.slippage_rate())
    }

    /// Fee charged on a fill's notional.
    pub fn fee(&self, notional: f64) -> f64 {
        notional * self.fee_rate()
    }

    /// Largest quantity `cash` can buy at `fill_price`, fee included.
    pub fn affordable_qty(&self, cash: f64, fill_price: f64) -> f64 {
        if fill_price > 0.0 && cash > 0.0 {
            cash / (fill_price * (1.0 + self.fee_rate()))
        } else {
            0.0
        }
    }

    /// Both rates must be finite and non-negative; slippage must stay below 100%.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fee_bps.is_finite() || self.fee_bps < 0.0 {
            return Err(ConfigError::InvalidCostRate {
                name: "fee_bps",
                value: self.fee_bps,
            });
        }
        if !self.slippage_bps.is_finite() || self.slippage_bps < 0.0 || self.slippage_bps >= 10_000.0
        {
            return Err(ConfigError::InvalidCostRate {
                name: "slippage_bps",
                value: self.slippage_bps,
            });
        }
        Ok(())
    }
}
