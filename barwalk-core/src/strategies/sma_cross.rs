use crate::domain::History;
use crate::error::StrategyError;
use crate::strategy::{Context, Decision, Strategy, StrategyParams};

/// Long while the short SMA of closes is above the long SMA, flat otherwise.
///
/// Parameters: `short` (20), `long` (60), `weight` (1.0). The averages are
/// computed from the visible history, so any window lengths work without
/// precomputed features. Until `long` bars exist the strategy stays flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmaCross;

/// Mean close of the last `period` visible bars, once that many exist.
pub(crate) fn trailing_mean(history: &History<'_>, period: usize) -> Option<f64> {
    let bars = history.bars();
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    Some(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
}

impl Strategy for SmaCross {
    type State = ();

    fn name(&self) -> &str {
        "sma_cross"
    }

    fn decide(
        &self,
        history: &History<'_>,
        _ctx: &Context,
        _state: &mut (),
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError> {
        let short = params.usize_or("short", 20);
        let long = params.usize_or("long", 60);
        if short >= long {
            return Err(StrategyError::new(format!(
                "sma_cross needs short < long, got short={short} long={long}"
            )));
        }
        let crossed = match (trailing_mean(history, short), trailing_mean(history, long)) {
            (Some(s), Some(l)) => s > l,
            _ => false,
        };
        Ok(if crossed {
            Decision::buy(params.f64_or("weight", 1.0))
        } else {
            Decision::sell()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bars_from_closes;
    use crate::domain::BarSeries;
    use crate::strategies::test_util::flat_ctx;
    use crate::strategy::Signal;

    fn decide_at(closes: &[f64], params: &StrategyParams) -> Result<Decision, StrategyError> {
        let series = BarSeries::new("T", bars_from_closes(closes)).unwrap();
        let h = series.history(closes.len() - 1);
        SmaCross.decide(&h, &flat_ctx(h.now(), 1_000.0, 1.0), &mut (), params)
    }

    #[test]
    fn rising_prices_go_long() {
        let closes: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let params = StrategyParams::new().with("short", 2).with("long", 5);
        assert_eq!(decide_at(&closes, &params).unwrap(), Decision::buy(1.0));
    }

    #[test]
    fn falling_prices_go_flat() {
        let closes: Vec<f64> = (1..=10).rev().map(|i| i as f64).collect();
        let params = StrategyParams::new().with("short", 2).with("long", 5);
        assert_eq!(decide_at(&closes, &params).unwrap().signal, Signal::Sell);
    }

    #[test]
    fn not_enough_history_stays_flat() {
        let params = StrategyParams::new();
        assert_eq!(decide_at(&[1.0, 2.0, 3.0], &params).unwrap().signal, Signal::Sell);
    }

    #[test]
    fn inverted_windows_are_an_error() {
        let params = StrategyParams::new().with("short", 10).with("long", 5);
        assert!(decide_at(&[1.0; 12], &params).is_err());
    }
}
