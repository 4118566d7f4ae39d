//! Run orchestration: config → bars → features → engine → summary.
//!
//! Two entry points:
//! - `run_from_config()`: loads bars for the config, then runs. Used by the CLI.
//! - `run_on_series()`: takes a pre-loaded, pre-annotated series. Used by
//!   batch runs that share one bar table across many parameter sets.

use thiserror::Error;
use tracing::info;

use barwalk_core::indicators::{annotate, standard_features};
use barwalk_core::{BarSeries, DataError, EngineError, RunResult};

use crate::config::{RunConfig, RunConfigError, RunId};
use crate::data_loader::{load_series, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl From<DataError> for RunError {
    fn from(err: DataError) -> Self {
        RunError::Load(LoadError::Data(err))
    }
}

/// A finished run and the id its artifacts are filed under.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub result: RunResult,
}

impl RunOutcome {
    pub fn one_line(&self) -> String {
        self.result.one_line(&self.run_id)
    }
}

/// Load bars and append the standard feature columns.
pub fn prepare_series(config: &RunConfig) -> Result<BarSeries, RunError> {
    let mut series = load_series(config)?;
    annotate(&mut series, &standard_features())?;
    Ok(series)
}

/// Run a config end to end and log its one-line summary.
pub fn run_from_config(config: &RunConfig) -> Result<RunOutcome, RunError> {
    config.validate()?;
    let series = prepare_series(config)?;
    run_on_series(config, &series)
}

/// Run a config against bars that were already loaded and annotated.
///
/// The config's `[data]` section is not consulted.
pub fn run_on_series(config: &RunConfig, series: &BarSeries) -> Result<RunOutcome, RunError> {
    let kind = config.strategy_kind().map_err(RunConfigError::from)?;
    let engine_config = config.to_engine_config().map_err(RunConfigError::from)?;
    let result = kind.run(series, &config.strategy.params, &engine_config)?;
    let outcome = RunOutcome {
        run_id: config.run_id(),
        result,
    };
    info!("{}", outcome.one_line());
    Ok(outcome)
}
