//! Artifact sink: persists a finished run.
//!
//! The filesystem sink lays a run out as
//!
//! ```text
//! <root>/
//!   summary.jsonl            one SummaryRecord per line, append-only
//!   runs/<run_id>/
//!     equity.csv             timestamp,equity
//!     orders.csv             one row per fill
//!     summary.json           the SummaryRecord, pretty-printed
//!     params.toml            the RunConfig the run was built from
//! ```
//!
//! Each JSONL line is an independent JSON object, so a partially written
//! index stays readable.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use barwalk_core::{EquityPoint, FillRecord, StrategyParams};

use crate::config::RunConfig;
use crate::runner::RunOutcome;

/// File name of the run index under the artifact root.
pub const SUMMARY_INDEX: &str = "summary.jsonl";

/// Flat per-run record written to `summary.json` and appended to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub run_id: String,
    pub symbol: String,
    pub res: String,
    pub strategy: String,
    pub pnl: f64,
    pub sharpe: f64,
    pub mdd: f64,
    /// Fill count, matching `Trades=` in the one-line summary.
    pub trades: usize,
    pub round_trips: usize,
    pub fee_bps: f64,
    pub slip_bps: f64,
    pub start: String,
    pub end: String,
    pub start_cash: f64,
    pub final_equity: f64,
    pub fees_paid: f64,
    pub bars: usize,
    /// Wall-clock time the run was recorded (RFC 3339, UTC).
    pub run_ts: String,
    pub params: StrategyParams,
}

impl SummaryRecord {
    pub fn from_outcome(outcome: &RunOutcome, recorded_at: DateTime<Utc>) -> Self {
        let s = &outcome.result.summary;
        Self {
            run_id: outcome.run_id.clone(),
            symbol: s.symbol.clone(),
            res: s.resolution.to_string(),
            strategy: s.strategy.clone(),
            pnl: s.pnl,
            sharpe: s.sharpe,
            mdd: s.mdd,
            trades: s.fill_count,
            round_trips: s.round_trip_count,
            fee_bps: s.fee_bps,
            slip_bps: s.slippage_bps,
            start: s.start.date_naive().to_string(),
            end: s.end.date_naive().to_string(),
            start_cash: s.initial_cash,
            final_equity: s.final_equity,
            fees_paid: s.fees_paid,
            bars: s.bar_count,
            run_ts: recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            params: s.params.clone(),
        }
    }
}

/// Destination for finished runs.
pub trait ArtifactSink: Send + Sync {
    /// Persist one run. Returns the run's artifact directory, if the sink
    /// writes one.
    fn record(&self, config: &RunConfig, outcome: &RunOutcome) -> Result<Option<PathBuf>>;
}

/// Sink that keeps nothing. Used when no artifact root is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn record(&self, _config: &RunConfig, _outcome: &RunOutcome) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Filesystem sink rooted at an experiment directory.
#[derive(Debug)]
pub struct FsSink {
    root: PathBuf,
    // Serializes appends to the shared index during batch runs.
    index_lock: Mutex<()>,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("runs").join(run_id)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(SUMMARY_INDEX)
    }

    fn append_index(&self, record: &SummaryRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("failed to serialize summary record")?;
        line.push('\n');

        let _guard = self
            .index_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("summary index lock poisoned"))?;
        let path = self.index_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", path.display()))?;
        file.flush()?;
        Ok(())
    }
}

impl ArtifactSink for FsSink {
    fn record(&self, config: &RunConfig, outcome: &RunOutcome) -> Result<Option<PathBuf>> {
        let dir = self.run_dir(&outcome.run_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create run directory {}", dir.display()))?;

        write_equity_csv(&dir.join("equity.csv"), &outcome.result.equity_series)?;
        write_orders_csv(&dir.join("orders.csv"), &outcome.result.orders)?;

        let record = SummaryRecord::from_outcome(outcome, Utc::now());
        let json = serde_json::to_string_pretty(&record).context("failed to serialize summary.json")?;
        write_file(&dir.join("summary.json"), &json)?;

        let toml = config.to_toml_string().context("failed to render params.toml")?;
        write_file(&dir.join("params.toml"), &toml)?;

        self.append_index(&record)?;
        debug!(run_id = %outcome.run_id, dir = %dir.display(), "wrote run artifacts");
        Ok(Some(dir))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Write the equity series as `timestamp,equity`.
pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;
    wtr.write_record(["timestamp", "equity"])?;
    for point in equity {
        wtr.write_record([
            point.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            format!("{:.6}", point.equity),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the fill ledger, one row per fill. Header-only when there were no fills.
pub fn write_orders_csv(path: &Path, orders: &[FillRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create orders CSV {}", path.display()))?;
    wtr.write_record([
        "timestamp",
        "side",
        "quantity",
        "price",
        "notional",
        "fee",
        "cash",
        "equity",
        "weight_pre",
        "weight_post",
        "target_weight",
    ])?;
    for f in orders {
        wtr.write_record([
            f.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            f.side.to_string(),
            format!("{:.8}", f.quantity),
            format!("{:.6}", f.price),
            format!("{:.6}", f.notional),
            format!("{:.6}", f.fee),
            format!("{:.6}", f.cash),
            format!("{:.6}", f.equity),
            format!("{:.6}", f.weight_pre),
            format!("{:.6}", f.weight_post),
            format!("{:.6}", f.target_weight),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_from_config;
    use barwalk_core::StrategyKind;

    fn outcome(strategy: StrategyKind) -> (RunConfig, RunOutcome) {
        let mut config = RunConfig::synthetic(strategy, 120, 5);
        config.costs.fee_bps = 5.0;
        let outcome = run_from_config(&config).unwrap();
        (config, outcome)
    }

    #[test]
    fn writes_run_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsSink::new(tmp.path());
        let (config, outcome) = outcome(StrategyKind::BuyAndHold);

        let dir = sink.record(&config, &outcome).unwrap().unwrap();
        assert_eq!(dir, tmp.path().join("runs").join(&outcome.run_id));
        for file in ["equity.csv", "orders.csv", "summary.json", "params.toml"] {
            assert!(dir.join(file).is_file(), "missing {file}");
        }

        let equity = fs::read_to_string(dir.join("equity.csv")).unwrap();
        let mut lines = equity.lines();
        assert_eq!(lines.next(), Some("timestamp,equity"));
        assert_eq!(lines.count(), outcome.result.equity_series.len());

        let orders = fs::read_to_string(dir.join("orders.csv")).unwrap();
        assert_eq!(orders.lines().count(), outcome.result.orders.len() + 1);
        assert!(orders.lines().nth(1).unwrap().contains(",BUY,"));

        let params = fs::read_to_string(dir.join("params.toml")).unwrap();
        let back: RunConfig = toml::from_str(&params).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn summary_json_mirrors_run_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsSink::new(tmp.path());
        let (config, outcome) = outcome(StrategyKind::SmaCross);
        let dir = sink.record(&config, &outcome).unwrap().unwrap();

        let json = fs::read_to_string(dir.join("summary.json")).unwrap();
        let record: SummaryRecord = serde_json::from_str(&json).unwrap();
        let s = &outcome.result.summary;
        assert_eq!(record.run_id, outcome.run_id);
        assert_eq!(record.res, "1d");
        assert_eq!(record.strategy, "sma_cross");
        assert_eq!(record.trades, s.fill_count);
        assert_eq!(record.round_trips, s.round_trip_count);
        assert_eq!(record.fee_bps, 5.0);
        assert_eq!(record.start_cash, 10_000.0);
        assert_eq!(record.pnl, s.pnl);
    }

    #[test]
    fn index_appends_one_line_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsSink::new(tmp.path());
        let (c1, o1) = outcome(StrategyKind::BuyAndHold);
        let (c2, o2) = outcome(StrategyKind::AlignMacd);
        sink.record(&c1, &o1).unwrap();
        sink.record(&c2, &o2).unwrap();

        let index = fs::read_to_string(sink.index_path()).unwrap();
        let ids: Vec<String> = index
            .lines()
            .map(|l| serde_json::from_str::<SummaryRecord>(l).unwrap().run_id)
            .collect();
        assert_eq!(ids, vec![o1.run_id, o2.run_id]);
    }

    #[test]
    fn null_sink_writes_nothing() {
        let (config, outcome) = outcome(StrategyKind::BuyAndHold);
        assert_eq!(NullSink.record(&config, &outcome).unwrap(), None);
    }

    #[test]
    fn empty_ledger_writes_header_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("orders.csv");
        write_orders_csv(&path, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("timestamp,side,"));
    }
}
