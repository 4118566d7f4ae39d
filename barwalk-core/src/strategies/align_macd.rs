use crate::domain::History;
use crate::error::StrategyError;
use crate::strategy::{finite_feature, Context, Decision, Strategy, StrategyParams};

/// Trend-alignment entry with fixed take-profit / stop-loss exits.
///
/// Enters at `target_weight` (1.0) when `sma_20 > sma_60 > sma_120` and
/// `macd_line > 0`. While long, exits fully once the close is `tp_pct` (0.05)
/// above or `sl_pct` (-0.10) relative to the average entry price.
/// Needs the standard feature columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignMacd;

impl Strategy for AlignMacd {
    type State = ();

    fn name(&self) -> &str {
        "align_macd"
    }

    fn decide(
        &self,
        history: &History<'_>,
        ctx: &Context,
        _state: &mut (),
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError> {
        let tp_pct = params.f64_or("tp_pct", 0.05);
        let sl_pct = params.f64_or("sl_pct", -0.10);
        let target_weight = params.f64_or("target_weight", 1.0);
        let close = history.last().close;

        if ctx.has_position() {
            if let Some(avg) = ctx.position_avg_price.filter(|p| *p > 0.0) {
                let pnl = close / avg - 1.0;
                if pnl >= tp_pct || pnl <= sl_pct {
                    return Ok(Decision::sell());
                }
            }
        }

        let aligned = match (
            finite_feature(history, "sma_20"),
            finite_feature(history, "sma_60"),
            finite_feature(history, "sma_120"),
            finite_feature(history, "macd_line"),
        ) {
            (Some(s20), Some(s60), Some(s120), Some(macd)) => s20 > s60 && s60 > s120 && macd > 0.0,
            _ => false,
        };

        Ok(if aligned {
            Decision::buy(target_weight)
        } else {
            Decision::hold()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_util::{flat_ctx, flat_series, long_ctx};

    const ALIGNED: [(&str, f64); 4] = [
        ("sma_20", 103.0),
        ("sma_60", 102.0),
        ("sma_120", 101.0),
        ("macd_line", 0.5),
    ];

    #[test]
    fn enters_when_aligned() {
        let series = flat_series(5, 100.0, &ALIGNED);
        let h = series.history(4);
        let d = AlignMacd
            .decide(&h, &flat_ctx(h.now(), 1_000.0, 100.0), &mut (), &StrategyParams::new())
            .unwrap();
        assert_eq!(d, Decision::buy(1.0));
    }

    #[test]
    fn holds_during_warmup() {
        let mut features = ALIGNED;
        features[2].1 = f64::NAN;
        let series = flat_series(5, 100.0, &features);
        let h = series.history(4);
        let d = AlignMacd
            .decide(&h, &flat_ctx(h.now(), 1_000.0, 100.0), &mut (), &StrategyParams::new())
            .unwrap();
        assert!(d.is_hold());
    }

    #[test]
    fn take_profit_and_stop_loss() {
        let series = flat_series(5, 100.0, &ALIGNED);
        let h = series.history(4);
        let params = StrategyParams::new();
        // entry 95 -> +5.3%: take profit beats the aligned entry signal
        let ctx = long_ctx(h.now(), 0.0, 10.0, 95.0, 100.0);
        assert_eq!(AlignMacd.decide(&h, &ctx, &mut (), &params).unwrap(), Decision::sell());
        // entry 112 -> -10.7%
        let ctx = long_ctx(h.now(), 0.0, 10.0, 112.0, 100.0);
        assert_eq!(AlignMacd.decide(&h, &ctx, &mut (), &params).unwrap(), Decision::sell());
        // entry 99 -> +1%: stay in, re-assert target
        let ctx = long_ctx(h.now(), 0.0, 10.0, 99.0, 100.0);
        assert_eq!(AlignMacd.decide(&h, &ctx, &mut (), &params).unwrap(), Decision::buy(1.0));
    }
}
