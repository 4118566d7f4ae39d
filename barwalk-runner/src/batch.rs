//! Batch execution: many independent runs in parallel.
//!
//! Every run owns its engine invocation and its strategy state; the only
//! shared things are the read-only bar table and the artifact sink. Configs
//! that point at the same `[data]` and `[run]` window share one loaded,
//! feature-annotated series.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use barwalk_core::{BarSeries, ConfigError, StrategyParams};

use crate::config::{RunConfig, RunId};
use crate::runner::{prepare_series, run_from_config, run_on_series, RunError, RunOutcome};
use crate::sink::ArtifactSink;

/// Parameter grid: every key maps to the values to try.
///
/// Expansion is the cartesian product in key order, so the config list (and
/// therefore batch output order) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    axes: BTreeMap<String, Vec<Value>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one axis.
    pub fn axis(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        self.axes.insert(key.into(), values);
        self
    }

    /// Parse `key=v1,v2,...`, casting each value like a `--param` value.
    pub fn parse_axis(text: &str) -> Result<(String, Vec<Value>), ConfigError> {
        let (key, _) = StrategyParams::parse_kv(text)?;
        let raw = text.split_once('=').map_or("", |(_, v)| v);
        let values = raw
            .split(',')
            .map(|v| StrategyParams::parse_kv(&format!("{key}={v}")).map(|(_, value)| value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((key, values))
    }

    /// Total number of parameter sets (1 for an empty grid).
    pub fn size(&self) -> usize {
        self.axes.values().map(Vec::len).product()
    }

    /// Every parameter set in the grid.
    pub fn combinations(&self) -> Vec<StrategyParams> {
        let mut out = vec![StrategyParams::new()];
        for (key, values) in &self.axes {
            out = out
                .into_iter()
                .flat_map(|base| {
                    values
                        .iter()
                        .map(move |v| base.clone().with(key.clone(), v.clone()))
                })
                .collect();
        }
        out
    }

    /// One config per grid point, each the base config with the grid values
    /// layered over its strategy params.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        self.combinations()
            .into_iter()
            .map(|point| {
                let mut config = base.clone();
                config.strategy.params = config.strategy.params.clone().merged(&point);
                config
            })
            .collect()
    }
}

/// Result of one batch entry, in input order.
#[derive(Debug)]
pub struct BatchItem {
    pub run_id: RunId,
    pub outcome: Result<RunOutcome, RunError>,
    pub artifact_dir: Option<PathBuf>,
}

/// Run every config in parallel and hand each success to `sink`.
///
/// A failing run does not stop the others; its error is returned in its slot.
/// Sink failures are logged and leave `artifact_dir` empty.
pub fn run_batch(configs: &[RunConfig], sink: &dyn ArtifactSink) -> Vec<BatchItem> {
    // Load each distinct data source once. A source that fails to load is
    // stored as `None`; its runs fall back to `run_from_config` for the error.
    let mut series: BTreeMap<DataKey, Option<BarSeries>> = BTreeMap::new();
    for config in configs {
        series
            .entry(data_key(config))
            .or_insert_with(|| prepare_series(config).ok());
    }

    let items: Vec<BatchItem> = configs
        .par_iter()
        .map(|config| {
            let run_id = config.run_id();
            let outcome = match series.get(&data_key(config)) {
                Some(Some(bars)) => config
                    .validate()
                    .map_err(RunError::from)
                    .and_then(|_| run_on_series(config, bars)),
                _ => run_from_config(config),
            };
            let artifact_dir = match &outcome {
                Ok(o) => sink.record(config, o).unwrap_or_else(|e| {
                    warn!(run_id = %run_id, error = %e, "failed to record run");
                    None
                }),
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "run failed");
                    None
                }
            };
            BatchItem {
                run_id,
                outcome,
                artifact_dir,
            }
        })
        .collect();

    let ok = items.iter().filter(|i| i.outcome.is_ok()).count();
    info!(runs = items.len(), ok, failed = items.len() - ok, "batch finished");
    items
}

/// Everything that determines which bars a config loads.
type DataKey = (
    Option<PathBuf>,
    Option<usize>,
    u64,
    String,
    String,
    Option<NaiveDate>,
    Option<NaiveDate>,
);

fn data_key(config: &RunConfig) -> DataKey {
    (
        config.data.bars.clone(),
        config.data.synthetic,
        config.data.seed,
        config.run.symbol.clone(),
        config.run.resolution.clone(),
        config.run.start,
        config.run.end,
    )
}
