//! Run output: the equity series, the fill ledger and the summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EquityPoint, FillRecord};
use crate::metrics::Resolution;
use crate::strategy::StrategyParams;

/// Aggregates for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub symbol: String,
    pub strategy: String,
    pub resolution: Resolution,
    pub pnl: f64,
    pub sharpe: f64,
    pub mdd: f64,
    /// Every executed buy or sell, liquidation included.
    pub fill_count: usize,
    /// Completed flat -> long -> flat cycles.
    pub round_trip_count: usize,
    pub fee_bps: f64,
    pub slippage_bps: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_cash: f64,
    pub final_equity: f64,
    pub bar_count: usize,
    pub fees_paid: f64,
    pub params: StrategyParams,
}

impl RunSummary {
    /// One-line human summary, e.g.
    /// `[run_id=ab12] BTCUSDT 5m bucketed_allocation PnL=+3.1% Sharpe=1.20 MDD=-4.0% Trades=12 Fee=5bps Slip=4bps Period=2024-01-01→2024-03-01`.
    pub fn one_line(&self, run_id: &str) -> String {
        fn pct(x: f64) -> String {
            format!("{:+.1}%", x * 100.0)
        }
        format!(
            "[run_id={run_id}] {} {} {} PnL={} Sharpe={:.2} MDD={} Trades={} Fee={}bps Slip={}bps Period={}→{}",
            self.symbol,
            self.resolution,
            self.strategy,
            pct(self.pnl),
            self.sharpe,
            pct(self.mdd),
            self.fill_count,
            self.fee_bps.trunc() as i64,
            self.slippage_bps.trunc() as i64,
            self.start.date_naive(),
            self.end.date_naive(),
        )
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// One point per bar, in bar order.
    pub equity_series: Vec<EquityPoint>,
    /// Fills in execution order.
    pub orders: Vec<FillRecord>,
    pub summary: RunSummary,
}

impl RunResult {
    pub fn one_line(&self, run_id: &str) -> String {
        self.summary.one_line(run_id)
    }

    pub fn final_equity(&self) -> f64 {
        self.summary.final_equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn one_line_format() {
        let summary = RunSummary {
            symbol: "BTCUSDT".into(),
            strategy: "align_macd".into(),
            resolution: Resolution::M5,
            pnl: 0.0312,
            sharpe: 1.204,
            mdd: -0.04,
            fill_count: 12,
            round_trip_count: 6,
            fee_bps: 5.0,
            slippage_bps: 4.0,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            initial_cash: 10_000.0,
            final_equity: 10_312.0,
            bar_count: 100,
            fees_paid: 3.0,
            params: StrategyParams::new(),
        };
        assert_eq!(
            summary.one_line("abc"),
            "[run_id=abc] BTCUSDT 5m align_macd PnL=+3.1% Sharpe=1.20 MDD=-4.0% Trades=12 Fee=5bps Slip=4bps Period=2024-01-01→2024-03-01"
        );
    }
}
