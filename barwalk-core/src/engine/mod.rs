//! Simulation engine: the walk-forward bar loop and its supporting pieces.
//!
//! For every bar `i` except the last, the strategy decides at the close of
//! bar `i` and the resulting order fills at the open of bar `i + 1`:
//!
//! 1. Mark the account at close[i] and build the strategy [`Context`](crate::strategy::Context)
//! 2. Call the strategy with the history view ending at bar `i`
//! 3. Resolve the decision into a target weight at open[i + 1]
//! 4. Buy or sell the difference through the [`Portfolio`] accountant
//! 5. Record equity for bar `i + 1`, marked at close[i + 1]
//!
//! After the loop an open position is optionally liquidated at the final
//! close.

pub mod config;
pub mod cost_model;
pub mod loop_runner;
pub mod portfolio;
pub mod result;

pub use config::EngineConfig;
pub use cost_model::CostModel;
pub use loop_runner::run;
pub use portfolio::{Execution, Portfolio};
pub use result::{RunResult, RunSummary};
