//! Look-ahead contamination tests.
//!
//! Invariant: no value at bar t may depend on price data from bar t+1 or later.
//!
//! Indicators: compute on a truncated series (bars 0..150) and on the full
//! series (bars 0..300) and require bars 0..150 to match.
//!
//! Engine: run the same strategy on both series; everything recorded up to
//! the truncation point must match as well.

use barwalk_core::data::SyntheticBars;
use barwalk_core::domain::{Bar, BarSeries};
use barwalk_core::engine::{CostModel, EngineConfig};
use barwalk_core::indicators::*;
use barwalk_core::metrics::Resolution;
use barwalk_core::strategy::{StrategyKind, StrategyParams};

fn make_test_bars(n: usize) -> Vec<Bar> {
    SyntheticBars::new(n, 2024).generate()
}

/// Assert that the indicator produces identical values for bars 0..truncated_len
/// whether computed on a truncated or full series.
fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = &full_bars[..truncated_len];
    let full_result = indicator.compute(full_bars);
    let truncated_result = indicator.compute(truncated);

    assert_eq!(
        truncated_result.len(),
        truncated_len,
        "{}: truncated result length mismatch",
        indicator.name()
    );
    assert_eq!(
        full_result.len(),
        full_bars.len(),
        "{}: full result length mismatch",
        indicator.name()
    );

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];

        if t.is_nan() && f.is_nan() {
            continue;
        }

        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{}: look-ahead contamination at bar {i}: truncated={t}, full={f}, diff={}",
            indicator.name(),
            (t - f).abs()
        );
    }
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Sma::new(10), &bars, 150);
    assert_no_lookahead(&Sma::new(120), &bars, 150);
}

#[test]
fn lookahead_ema() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Ema::new(12), &bars, 150);
    assert_no_lookahead(&Ema::new(26), &bars, 150);
}

#[test]
fn lookahead_macd() {
    let bars = make_test_bars(300);
    for component in [MacdComponent::Line, MacdComponent::Signal, MacdComponent::Hist] {
        assert_no_lookahead(&Macd::new(12, 26, 9, component), &bars, 150);
    }
}

#[test]
fn lookahead_atr() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Atr::new(14), &bars, 150);
    assert_no_lookahead(&Atr::new(5), &bars, 150);
}

#[test]
fn lookahead_rsi() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Rsi::new(14), &bars, 150);
    assert_no_lookahead(&Rsi::new(7), &bars, 150);
}

#[test]
fn lookahead_standard_features() {
    let bars = make_test_bars(300);
    for indicator in standard_features() {
        assert_no_lookahead(indicator.as_ref(), &bars, 150);
    }
}

fn annotated(bars: Vec<Bar>) -> BarSeries {
    let mut series = BarSeries::new("LA", bars).unwrap();
    annotate(&mut series, &standard_features()).unwrap();
    series
}

#[test]
fn engine_prefix_is_unaffected_by_future_bars() {
    let bars = SyntheticBars::new(900, 77)
        .with_resolution(Resolution::H1)
        .generate();
    let cut = 500;
    let truncated = annotated(bars[..cut].to_vec());
    let full = annotated(bars);

    let config = EngineConfig::new(10_000.0, CostModel::new(5.0, 4.0), Resolution::H1)
        .with_liquidation(false);
    let params = StrategyParams::new();

    for kind in StrategyKind::all() {
        let a = kind.run(&truncated, &params, &config).unwrap();
        let b = kind.run(&full, &params, &config).unwrap();

        assert_eq!(a.equity_series[..], b.equity_series[..cut], "{kind}: equity diverged");
        let cutoff = truncated.last_timestamp();
        let b_prefix: Vec<_> = b
            .orders
            .iter()
            .filter(|o| o.timestamp <= cutoff)
            .cloned()
            .collect();
        assert_eq!(a.orders, b_prefix, "{kind}: orders diverged");
    }
}
