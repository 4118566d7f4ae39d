//! Feature provider: indicators computed once over the whole bar table and
//! appended as feature columns before the simulation starts.
//!
//! The smoothing conventions follow the exponential-weighting used by the
//! research pipeline these features are compared against: recursive from the
//! first observation (no SMA seed), NaN until `min_periods` observations.
//!
//! MACD is a multi-series indicator; it is exposed as separate named instances
//! per component, keeping the single-series `Indicator` trait unchanged.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use ema::{ewm, Ema};
pub use macd::{Macd, MacdComponent};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::{Bar, BarSeries};
use crate::error::DataError;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. Values before `lookback()` are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Index of the first bar with a valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// The feature set appended by the standard pipeline.
pub fn standard_features() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Sma::new(20)),
        Box::new(Sma::new(60)),
        Box::new(Sma::new(120)),
        Box::new(Macd::new(12, 26, 9, MacdComponent::Line)),
        Box::new(Macd::new(12, 26, 9, MacdComponent::Signal)),
        Box::new(Macd::new(12, 26, 9, MacdComponent::Hist)),
        Box::new(Atr::new(14)),
        Box::new(Rsi::new(14)),
    ]
}

/// Compute each indicator over the series and append it as a feature column.
pub fn annotate(series: &mut BarSeries, indicators: &[Box<dyn Indicator>]) -> Result<(), DataError> {
    for indicator in indicators {
        let values = indicator.compute(series.bars());
        series.insert_feature(indicator.name(), values)?;
    }
    Ok(())
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_feature_names() {
        let names: Vec<String> = standard_features()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "sma_20",
                "sma_60",
                "sma_120",
                "macd_line",
                "macd_signal",
                "macd_hist",
                "atr_14",
                "rsi_14"
            ]
        );
    }

    #[test]
    fn annotate_appends_aligned_columns() {
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + (i as f64 * 0.2).sin() * 5.0).collect();
        let mut series = BarSeries::new("TEST", make_bars(&closes)).unwrap();
        annotate(&mut series, &standard_features()).unwrap();

        assert_eq!(series.features().len(), 8);
        for name in series.features().names() {
            assert_eq!(series.features().column(name).unwrap().len(), 150);
        }
        assert!(series.features().get("sma_120", 118).unwrap().is_nan());
        assert!(series.features().get("sma_120", 119).unwrap().is_finite());
    }
}
