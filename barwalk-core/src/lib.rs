//! Barwalk Core: walk-forward simulation of a single long-only instrument.
//!
//! This crate contains the simulation core:
//! - Domain types (bars, blinded history view, positions, fills, equity points)
//! - Feature provider (indicators appended as columns before a run)
//! - Decision protocol (strategy trait, typed decisions, run-scoped state)
//! - Simulation engine with the portfolio accountant
//! - Metrics calculator
//! - Built-in strategies and their compile-time registry
//!
//! The core performs no I/O. Loading bars and persisting results belongs to
//! `barwalk-runner`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod strategies;
pub mod strategy;

pub use domain::{Bar, BarSeries, EquityPoint, FillRecord, History, Side};
pub use engine::{run, CostModel, EngineConfig, RunResult, RunSummary};
pub use error::{ConfigError, DataError, EngineError, InvariantViolation, StrategyError};
pub use metrics::{Metrics, Resolution};
pub use strategy::{Context, Decision, Signal, Strategy, StrategyKind, StrategyParams};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross threads in batch runs are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::History<'static>>();
        require_sync::<domain::History<'static>>();
        require_send::<domain::FillRecord>();
        require_sync::<domain::FillRecord>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();

        // Engine types
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::Portfolio>();
        require_sync::<engine::Portfolio>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();

        // Errors
        require_send::<error::EngineError>();
        require_sync::<error::EngineError>();

        // Strategies and their state
        require_send::<strategy::StrategyParams>();
        require_sync::<strategy::StrategyParams>();
        require_send::<strategies::BucketedAllocation>();
        require_sync::<strategies::BucketedAllocation>();
        require_send::<strategies::BucketState>();
        require_sync::<strategies::BucketState>();
        require_send::<strategies::SmaMacdAtr>();
        require_sync::<strategies::ChandelierState>();

        // Indicators
        require_send::<Box<dyn indicators::Indicator>>();
        require_sync::<Box<dyn indicators::Indicator>>();
    }

    /// Architecture contract: a strategy only reaches bar data through `History`.
    ///
    /// `decide` takes a `History` (bars up to the decision bar) and a `Context`
    /// snapshot. There is no parameter through which the full table or a later
    /// bar could be passed; if that changes, this stops compiling.
    #[test]
    fn strategy_trait_sees_history_only() {
        fn _check<S: Strategy>(
            s: &S,
            h: &History<'_>,
            c: &Context,
            st: &mut S::State,
            p: &StrategyParams,
        ) -> Result<Decision, StrategyError> {
            s.decide(h, c, st, p)
        }
    }
}
