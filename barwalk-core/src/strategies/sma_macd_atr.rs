use serde::{Deserialize, Serialize};

use super::sma_cross::trailing_mean;
use crate::domain::History;
use crate::error::StrategyError;
use crate::strategy::{finite_feature, Context, Decision, Strategy, StrategyParams};

/// SMA cross with MACD confirmation and a chandelier exit.
///
/// Goes long at `weight` (1.0) when the `sma_short` (20) mean of closes is
/// above the `sma_long` (60) mean and `macd_line > 0`. Once long, exits when
/// any of these holds:
/// - close below `max(high over atr_n bars) - atr_k * atr_{atr_n}`
/// - the short mean drops below the long one
/// - `macd_line < 0`
///
/// Defaults: `atr_n` 14, `atr_k` 3.0. MACD and ATR come from the `macd_line`
/// and `atr_{atr_n}` feature columns; a missing column is an error, a warmup
/// NaN just fails the condition it feeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmaMacdAtr;

/// Whether the signal machine is currently long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChandelierState {
    pub long: bool,
}

/// Highest high of the last `period` visible bars, once that many exist.
fn trailing_high(history: &History<'_>, period: usize) -> Option<f64> {
    let bars = history.bars();
    if period == 0 || bars.len() < period {
        return None;
    }
    bars[bars.len() - period..]
        .iter()
        .map(|b| b.high)
        .reduce(f64::max)
}

fn require_column(history: &History<'_>, name: &str) -> Result<(), StrategyError> {
    match history.feature_series(name) {
        Some(_) => Ok(()),
        None => Err(StrategyError::new(format!(
            "sma_macd_atr needs feature column '{name}'"
        ))),
    }
}

impl Strategy for SmaMacdAtr {
    type State = ChandelierState;

    fn name(&self) -> &str {
        "sma_macd_atr"
    }

    fn decide(
        &self,
        history: &History<'_>,
        _ctx: &Context,
        state: &mut ChandelierState,
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError> {
        let short = params.usize_or("sma_short", 20);
        let long = params.usize_or("sma_long", 60);
        let atr_n = params.usize_or("atr_n", 14);
        let atr_k = params.f64_or("atr_k", 3.0);
        if short >= long {
            return Err(StrategyError::new(format!(
                "sma_macd_atr needs sma_short < sma_long, got {short} and {long}"
            )));
        }
        let atr_name = format!("atr_{atr_n}");
        require_column(history, "macd_line")?;
        require_column(history, &atr_name)?;

        let close = history.last().close;
        let s = trailing_mean(history, short);
        let l = trailing_mean(history, long);
        let macd = finite_feature(history, "macd_line");

        if state.long {
            let stop = trailing_high(history, atr_n)
                .zip(finite_feature(history, &atr_name))
                .map(|(high, atr)| high - atr_k * atr);
            let below_stop = stop.is_some_and(|stop| close < stop);
            let crossed_down = matches!((s, l), (Some(s), Some(l)) if s < l);
            let macd_negative = macd.is_some_and(|m| m < 0.0);
            if below_stop || crossed_down || macd_negative {
                state.long = false;
                return Ok(Decision::sell());
            }
            return Ok(Decision::hold());
        }

        let crossed_up = matches!((s, l), (Some(s), Some(l)) if s > l);
        if crossed_up && macd.is_some_and(|m| m > 0.0) {
            state.long = true;
            return Ok(Decision::buy(params.f64_or("weight", 1.0)));
        }
        Ok(Decision::hold())
    }
}
