//! Metrics calculator: PnL, annualized Sharpe and max drawdown from an
//! equity series.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::equity::{equity_values, EquityPoint};
use crate::error::ConfigError;

/// Supported bar resolutions. Annualization assumes a 24/7 market
/// (365-day years).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::M1 => "1m",
            Resolution::M5 => "5m",
            Resolution::M15 => "15m",
            Resolution::M30 => "30m",
            Resolution::H1 => "1h",
            Resolution::H4 => "4h",
            Resolution::D1 => "1d",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Resolution::M1 => 1,
            Resolution::M5 => 5,
            Resolution::M15 => 15,
            Resolution::M30 => 30,
            Resolution::H1 => 60,
            Resolution::H4 => 240,
            Resolution::D1 => 1440,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Bars per year: 365 for daily, 105_120 for 5-minute bars.
    pub fn periods_per_year(&self) -> f64 {
        (365 * 1440 / self.minutes()) as f64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(Resolution::M1),
            "5m" => Ok(Resolution::M5),
            "15m" => Ok(Resolution::M15),
            "30m" => Ok(Resolution::M30),
            "1h" => Ok(Resolution::H1),
            "4h" => Ok(Resolution::H4),
            "1d" => Ok(Resolution::D1),
            other => Err(ConfigError::UnsupportedResolution(other.to_string())),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.as_str().to_string()
    }
}

/// Summary performance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// final / initial - 1
    pub pnl: f64,
    pub sharpe: f64,
    /// Most negative drawdown from the running peak (<= 0).
    pub mdd: f64,
}

impl Metrics {
    pub fn zero() -> Self {
        Self {
            pnl: 0.0,
            sharpe: 0.0,
            mdd: 0.0,
        }
    }

    /// Compute metrics from raw equity values. Fewer than 2 points yields zeros.
    pub fn compute(equity: &[f64], periods_per_year: f64) -> Self {
        if equity.len() < 2 {
            return Self::zero();
        }
        let returns = simple_returns(equity);
        Self {
            pnl: total_return(equity),
            sharpe: sharpe_ratio(&returns, periods_per_year),
            mdd: max_drawdown(equity),
        }
    }
}

/// Metrics for an equity series at a named resolution.
///
/// The resolution is validated before anything else; an unsupported one is
/// an error even for a series too short to measure.
pub fn compute_for(series: &[EquityPoint], resolution: &str) -> Result<Metrics, ConfigError> {
    let resolution: Resolution = resolution.parse()?;
    Ok(Metrics::compute(
        &equity_values(series),
        resolution.periods_per_year(),
    ))
}

/// Per-step simple returns, skipping steps that are not finite.
pub fn simple_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

/// Annualized Sharpe (zero risk-free rate) using the sample standard
/// deviation. Zero when there are fewer than 2 returns or no variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / n as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let sd = variance.sqrt();
    if sd.is_nan() || sd <= 1e-15 {
        return 0.0;
    }
    mean / sd * periods_per_year.sqrt()
}

/// Minimum of `equity / running_max - 1`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut mdd = 0.0_f64;
    for &e in equity {
        peak = peak.max(e);
        if peak > 0.0 {
            mdd = mdd.min(e / peak - 1.0);
        }
    }
    mdd
}

pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
        _ => 0.0,
    }
}
