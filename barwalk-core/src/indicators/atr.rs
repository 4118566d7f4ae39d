//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), with
//! TR[0] = high[0] - low[0].
//! ATR uses Wilder smoothing (exponential, alpha = 1/period).
//! Lookback: period - 1.

use super::ema::ewm;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let (h, l) = (bar.high, bar.low);
            if h.is_nan() || l.is_nan() {
                return f64::NAN;
            }
            let range = h - l;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(pc) if !pc.is_nan() => range.max((h - pc).abs()).max((l - pc).abs()),
                _ => range,
            }
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        ewm(&true_range(bars), 1.0 / self.period as f64, self.period)
    }
}
