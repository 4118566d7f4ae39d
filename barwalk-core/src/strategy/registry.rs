//! Compile-time strategy registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::StrategyParams;
use crate::domain::BarSeries;
use crate::engine::{self, EngineConfig, RunResult};
use crate::error::{ConfigError, EngineError};
use crate::strategies::{AlignMacd, BucketedAllocation, BuyAndHold, SmaCross, SmaMacdAtr};

/// The built-in strategies, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BuyAndHold,
    SmaCross,
    AlignMacd,
    BucketedAllocation,
    SmaMacdAtr,
}

impl StrategyKind {
    pub fn all() -> &'static [StrategyKind] {
        &[
            StrategyKind::BuyAndHold,
            StrategyKind::SmaCross,
            StrategyKind::AlignMacd,
            StrategyKind::BucketedAllocation,
            StrategyKind::SmaMacdAtr,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::BuyAndHold => "buy_and_hold",
            StrategyKind::SmaCross => "sma_cross",
            StrategyKind::AlignMacd => "align_macd",
            StrategyKind::BucketedAllocation => "bucketed_allocation",
            StrategyKind::SmaMacdAtr => "sma_macd_atr",
        }
    }

    /// Run the engine with this strategy. Each call gets fresh strategy state.
    pub fn run(
        &self,
        bars: &BarSeries,
        params: &StrategyParams,
        config: &EngineConfig,
    ) -> Result<RunResult, EngineError> {
        match self {
            StrategyKind::BuyAndHold => engine::run(bars, &BuyAndHold, params, config),
            StrategyKind::SmaCross => engine::run(bars, &SmaCross, params, config),
            StrategyKind::AlignMacd => engine::run(bars, &AlignMacd, params, config),
            StrategyKind::BucketedAllocation => {
                engine::run(bars, &BucketedAllocation, params, config)
            }
            StrategyKind::SmaMacdAtr => engine::run(bars, &SmaMacdAtr, params, config),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StrategyKind::all()
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}
