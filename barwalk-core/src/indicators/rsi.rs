//! Relative Strength Index (RSI).
//!
//! Wilder smoothing (alpha = 1/period) of gains and losses of close-to-close
//! changes. RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period. A zero average loss yields NaN rather than 100.

use super::ema::ewm;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            if !change.is_nan() {
                gains[i] = change.max(0.0);
                losses[i] = (-change).max(0.0);
            }
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm(&gains, alpha, self.period);
        let avg_loss = ewm(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if l == 0.0 || l.is_nan() || g.is_nan() {
                    f64::NAN
                } else {
                    100.0 - 100.0 / (1.0 + g / l)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsi_known_values() {
        // changes: +1, -1, +2, -1
        // alpha = 1/2; gains 1,0,2,0 -> 1, 0.5, 1.25, 0.625
        //             losses 0,1,0,1 -> 0, 0.5, 0.25, 0.625
        let bars = make_bars(&[10.0, 11.0, 10.0, 12.0, 11.0]);
        let result = Rsi::new(2).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // idx2: g=0.5 l=0.5 -> 50
        assert_approx(result[2], 50.0, DEFAULT_EPSILON);
        // idx3: g=1.25 l=0.25 -> rs 5 -> 100 - 100/6
        assert_approx(result[3], 100.0 - 100.0 / 6.0, DEFAULT_EPSILON);
        // idx4: g=0.625 l=0.625 -> 50
        assert_approx(result[4], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_all_gains_is_nan() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let result = Rsi::new(3).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let bars = make_bars(&[6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[5], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
