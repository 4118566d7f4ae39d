//! Error taxonomy for the simulation core.
//!
//! Four failure classes, each its own type so callers can match on what went
//! wrong without string inspection:
//! - [`DataError`]: the bar table cannot be simulated (empty, unordered, bad prices)
//! - [`ConfigError`]: unsupported resolution or invalid cost/cash parameters
//! - [`StrategyError`]: the decision function itself failed
//! - [`InvariantViolation`]: cash/quantity bookkeeping broke (a bug, never expected)
//!
//! [`EngineError`] is the umbrella returned by `engine::run`.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Problems with the input bar table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar table is empty")]
    Empty,

    #[error("timestamps must be strictly increasing: bar {index} at {timestamp} does not follow {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} has an invalid {field} price: {value}")]
    InvalidPrice {
        index: usize,
        timestamp: DateTime<Utc>,
        field: &'static str,
        value: f64,
    },

    #[error("feature column '{name}' has {actual} values, expected {expected}")]
    FeatureLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Invalid run configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported resolution '{0}' (supported: 1m, 5m, 15m, 30m, 1h, 4h, 1d)")]
    UnsupportedResolution(String),

    #[error("{name} must be a finite, non-negative basis-point rate, got {value}")]
    InvalidCostRate { name: &'static str, value: f64 },

    #[error("initial cash must be finite and positive, got {0}")]
    InvalidInitialCash(f64),

    #[error("weight cap must be in (0, 1], got {0}")]
    InvalidWeightCap(f64),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("malformed parameter '{0}', expected key=value")]
    MalformedParam(String),
}

/// Error raised by a decision function.
///
/// The engine never inspects or recovers from these; they reach the caller
/// with their original source intact.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StrategyError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error raised inside a strategy.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Cash/quantity bookkeeping invariant broken by the fill logic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("position quantity went negative: {0}")]
    NegativeQuantity(f64),

    #[error("average entry price defined={has_price} but quantity={quantity}")]
    AvgPriceMismatch { quantity: f64, has_price: bool },

    #[error("cash went negative after a buy: {0}")]
    NegativeCash(f64),
}

/// Everything `engine::run` can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("strategy failed at {at}: {source}")]
    Strategy {
        at: DateTime<Utc>,
        #[source]
        source: StrategyError,
    },

    #[error("execution invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}
