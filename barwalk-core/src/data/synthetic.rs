//! Seeded random-walk bars.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarSeries};
use crate::error::DataError;
use crate::metrics::Resolution;

/// Parameters of a geometric random walk. The same parameters always produce
/// the same bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBars {
    pub symbol: String,
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    /// Maximum absolute per-bar log return.
    pub volatility: f64,
    /// Per-bar log drift.
    pub drift: f64,
    pub resolution: Resolution,
    pub start: DateTime<Utc>,
}

impl Default for SyntheticBars {
    fn default() -> Self {
        Self {
            symbol: "SYNTH".into(),
            bars: 500,
            seed: 42,
            start_price: 100.0,
            volatility: 0.02,
            drift: 0.0002,
            resolution: Resolution::D1,
            start: super::default_start(),
        }
    }
}

impl SyntheticBars {
    pub fn new(bars: usize, seed: u64) -> Self {
        Self {
            bars,
            seed,
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Generate the raw bars.
    pub fn generate(&self) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let step = self.resolution.duration();
        let vol = self.volatility.abs();
        let mut prev_close = self.start_price;
        let mut out = Vec::with_capacity(self.bars);

        for i in 0..self.bars {
            let gap: f64 = rng.gen_range(-0.25..=0.25) * vol;
            let open = prev_close * gap.exp();
            let ret: f64 = self.drift + rng.gen_range(-1.0..=1.0) * vol;
            let close = open * ret.exp();
            let wick_up: f64 = rng.gen_range(0.0..=0.5) * vol;
            let wick_down: f64 = rng.gen_range(0.0..=0.5) * vol;
            out.push(Bar {
                timestamp: self.start + step * i as i32,
                open,
                high: open.max(close) * wick_up.exp(),
                low: open.min(close) * (-wick_down).exp(),
                close,
                volume: rng.gen_range(100.0..10_000.0),
            });
            prev_close = close;
        }
        out
    }

    /// Generate and validate as a [`BarSeries`].
    pub fn series(&self) -> Result<BarSeries, DataError> {
        BarSeries::new(self.symbol.clone(), self.generate())
    }
}
