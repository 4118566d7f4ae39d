//! Serializable run configuration.
//!
//! A `RunConfig` is read once from TOML (or assembled from CLI flags) and
//! carries everything needed to reproduce a run:
//!
//! ```toml
//! [run]
//! symbol = "BTCUSDT"
//! resolution = "5m"
//! start = "2024-01-01"
//! end = "2024-03-01"
//! initial_cash = 10000.0
//!
//! [costs]
//! fee_bps = 5.0
//! slippage_bps = 4.0
//!
//! [strategy]
//! name = "align_macd"
//! params = { tp_pct = 0.05, sl_pct = -0.10 }
//!
//! [data]
//! bars = "data/BTCUSDT_5m.csv"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use barwalk_core::{ConfigError, CostModel, EngineConfig, Resolution, StrategyKind, StrategyParams};

/// Unique identifier for a run (content hash of its configuration).
pub type RunId = String;

/// Hex characters kept from the blake3 digest.
const RUN_ID_LEN: usize = 16;

/// Errors raised while reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error("[data] needs exactly one of `bars` (CSV path) or `synthetic` (bar count)")]
    DataSource,

    #[error("window start {start} is not before end {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
}

/// Complete description of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub costs: CostSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub data: DataSection,
}

/// `[run]`: instrument, window and account settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSection {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Inclusive start of the bar window (UTC midnight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Exclusive end of the bar window (UTC midnight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_true")]
    pub liquidate_on_end: bool,
    #[serde(default = "default_weight_cap")]
    pub weight_cap: f64,
}

/// `[costs]`: proportional fee and slippage in basis points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CostSection {
    #[serde(default)]
    pub fee_bps: f64,
    #[serde(default)]
    pub slippage_bps: f64,
}

/// `[strategy]`: registry name plus free-form parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategySection {
    pub name: String,
    #[serde(default, skip_serializing_if = "StrategyParams::is_empty")]
    pub params: StrategyParams,
}

/// `[data]`: where the bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    /// CSV file with `timestamp,open,high,low,close,volume` columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bars: Option<PathBuf>,
    /// Generate this many synthetic bars instead of reading a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            resolution: default_resolution(),
            start: None,
            end: None,
            initial_cash: default_initial_cash(),
            liquidate_on_end: true,
            weight_cap: default_weight_cap(),
        }
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            bars: None,
            synthetic: None,
            seed: default_seed(),
        }
    }
}

fn default_symbol() -> String {
    "SYNTH".into()
}

fn default_resolution() -> String {
    Resolution::D1.as_str().into()
}

fn default_initial_cash() -> f64 {
    10_000.0
}

fn default_true() -> bool {
    true
}

fn default_weight_cap() -> f64 {
    1.0
}

fn default_seed() -> u64 {
    42
}

/// Where bars for a run are loaded from, once `[data]` has been validated.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic { bars: usize, seed: u64 },
}

impl RunConfig {
    /// A minimal config: the named strategy on `bars` synthetic daily bars.
    pub fn synthetic(strategy: StrategyKind, bars: usize, seed: u64) -> Self {
        Self {
            run: RunSection::default(),
            costs: CostSection::default(),
            strategy: StrategySection {
                name: strategy.name().into(),
                params: StrategyParams::new(),
            },
            data: DataSection {
                bars: None,
                synthetic: Some(bars),
                seed,
            },
        }
    }

    /// Parse a config from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file. Relative `[data] bars` paths
    /// resolve against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let (Some(bars), Some(dir)) = (config.data.bars.as_mut(), path.parent()) {
            if bars.is_relative() {
                *bars = dir.join(&*bars);
            }
        }
        Ok(config)
    }

    /// Check everything that can be checked without loading bars.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.strategy_kind()?;
        self.to_engine_config()?.validate()?;
        self.data_source()?;
        if let (Some(start), Some(end)) = (self.run.start, self.run.end) {
            if start >= end {
                return Err(RunConfigError::EmptyWindow { start, end });
            }
        }
        Ok(())
    }

    pub fn strategy_kind(&self) -> Result<StrategyKind, ConfigError> {
        self.strategy.name.parse()
    }

    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        self.run.resolution.parse()
    }

    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let cost = CostModel::new(self.costs.fee_bps, self.costs.slippage_bps);
        Ok(EngineConfig::new(self.run.initial_cash, cost, self.resolution()?)
            .with_weight_cap(self.run.weight_cap)
            .with_liquidation(self.run.liquidate_on_end))
    }

    pub fn data_source(&self) -> Result<DataSource, RunConfigError> {
        match (&self.data.bars, self.data.synthetic) {
            (Some(path), None) => Ok(DataSource::Csv(path.clone())),
            (None, Some(bars)) if bars > 0 => Ok(DataSource::Synthetic {
                bars,
                seed: self.data.seed,
            }),
            _ => Err(RunConfigError::DataSource),
        }
    }

    /// Window bounds as UTC instants: `[start, end)`.
    pub fn window(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let at_midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        (
            self.run.start.and_then(at_midnight),
            self.run.end.and_then(at_midnight),
        )
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share a run id, so re-running a config
    /// overwrites its artifact directory instead of piling up copies.
    pub fn run_id(&self) -> RunId {
        // Serializing a plain data struct with string keys cannot fail; the
        // debug form is a stable fallback all the same.
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        let hash = blake3::hash(json.as_bytes());
        hash.to_hex()[..RUN_ID_LEN].to_string()
    }

    /// TOML rendering written next to the run's artifacts.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
