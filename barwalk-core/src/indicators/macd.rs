//! MACD (Moving Average Convergence Divergence).
//!
//! line   = EMA(fast) - EMA(slow)
//! signal = EMA(line, signal_period), smoothing starts at the first valid line value
//! hist   = line - signal

use super::ema::{ewm, span_alpha};
use super::Indicator;
use crate::domain::Bar;

/// Which MACD series an instance produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdComponent {
    Line,
    Signal,
    Hist,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    component: MacdComponent,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, component: MacdComponent) -> Self {
        assert!(fast >= 1 && slow >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be shorter than slow period");
        let suffix = match component {
            MacdComponent::Line => "line",
            MacdComponent::Signal => "signal",
            MacdComponent::Hist => "hist",
        };
        Self {
            fast,
            slow,
            signal,
            component,
            name: format!("macd_{suffix}"),
        }
    }

    pub fn component(&self) -> MacdComponent {
        self.component
    }
}

/// Compute all three MACD series from closes.
pub fn macd_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let ema_fast = ewm(closes, span_alpha(fast), fast);
    let ema_slow = ewm(closes, span_alpha(slow), slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let sig = ewm(&line, span_alpha(signal), signal);
    let hist = line.iter().zip(&sig).map(|(l, s)| l - s).collect();
    (line, sig, hist)
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.component {
            MacdComponent::Line => self.slow - 1,
            MacdComponent::Signal | MacdComponent::Hist => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (line, signal, hist) = macd_series(&closes, self.fast, self.slow, self.signal);
        match self.component {
            MacdComponent::Line => line,
            MacdComponent::Signal => signal,
            MacdComponent::Hist => hist,
        }
    }
}
