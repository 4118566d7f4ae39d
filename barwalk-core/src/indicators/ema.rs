//! Exponential Moving Average (EMA) and the shared exponential smoother.
//!
//! `ewm` is recursive from the first valid observation:
//! y[first] = x[first], y[t] = alpha * x[t] + (1 - alpha) * y[t-1].
//! Output stays NaN until `min_periods` valid observations have been seen.
//! A NaN input carries the previous smoothed value forward without counting
//! as an observation.

use super::Indicator;
use crate::domain::Bar;

/// Exponential smoothing with `adjust = false` semantics.
pub fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut prev: Option<f64> = None;
    let mut observations = 0usize;

    for (i, &x) in values.iter().enumerate() {
        if !x.is_nan() {
            observations += 1;
            prev = Some(match prev {
                Some(p) => alpha * x + (1.0 - alpha) * p,
                None => x,
            });
        }
        if observations >= min_periods.max(1) {
            if let Some(p) = prev {
                result[i] = p;
            }
        }
    }
    result
}

/// Smoothing factor for a span: 2 / (span + 1).
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ewm(&closes, span_alpha(self.period), self.period)
    }
}
