//! Run-history summary: rank the runs recorded in `summary.jsonl`.
//!
//! Rows are kept as loose JSON objects rather than `SummaryRecord`s so that
//! indexes written by older versions (or with extra fields) still summarize.
//! The output CSV has one column per field seen in any kept row, sorted by
//! name.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::sink::SUMMARY_INDEX;

/// File name of the ranked output under the artifact root.
pub const SUMMARY_CSV: &str = "summary.csv";

/// Default number of rows kept.
pub const DEFAULT_TOP: usize = 1000;

pub type SummaryRow = Map<String, Value>;

/// Column to rank runs by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Sharpe,
    Pnl,
    Mdd,
    Trades,
    RunTs,
}

impl SortKey {
    pub fn field(&self) -> &'static str {
        match self {
            SortKey::Sharpe => "sharpe",
            SortKey::Pnl => "pnl",
            SortKey::Mdd => "mdd",
            SortKey::Trades => "trades",
            SortKey::RunTs => "run_ts",
        }
    }

    /// Best-first direction: higher sharpe, pnl and newer runs first; fewer
    /// trades and deeper (more negative) drawdowns first.
    pub fn descending(&self) -> bool {
        matches!(self, SortKey::Sharpe | SortKey::Pnl | SortKey::RunTs)
    }

    /// Numeric sort value of a row. A missing field sorts as 0, a missing or
    /// unparseable `run_ts` as the oldest possible time.
    fn value(&self, row: &SummaryRow) -> f64 {
        match self {
            SortKey::RunTs => row
                .get(self.field())
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map_or(f64::MIN, |t| t.timestamp_millis() as f64),
            _ => row.get(self.field()).and_then(Value::as_f64).unwrap_or(0.0),
        }
    }
}

/// A `--sort-by` value that names no [`SortKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort key '{0}' (expected sharpe, pnl, mdd, trades, run_ts)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharpe" => Ok(SortKey::Sharpe),
            "pnl" => Ok(SortKey::Pnl),
            "mdd" => Ok(SortKey::Mdd),
            "trades" => Ok(SortKey::Trades),
            "run_ts" => Ok(SortKey::RunTs),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

/// Read every JSON object line of an index file.
///
/// Blank lines are skipped; malformed lines are logged and skipped. A missing
/// file yields no rows.
pub fn read_index(path: &Path) -> Result<Vec<SummaryRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(row)) => rows.push(row),
            Ok(_) => warn!(line = i + 1, "skipping non-object line in run index"),
            Err(e) => warn!(line = i + 1, error = %e, "skipping malformed line in run index"),
        }
    }
    Ok(rows)
}

/// Stable sort by `key` in its best-first direction, then keep `top` rows.
pub fn rank(mut rows: Vec<SummaryRow>, key: SortKey, top: usize) -> Vec<SummaryRow> {
    rows.sort_by(|a, b| {
        let (va, vb) = (key.value(a), key.value(b));
        if key.descending() {
            vb.total_cmp(&va)
        } else {
            va.total_cmp(&vb)
        }
    });
    rows.truncate(top);
    rows
}

/// Render ranked rows as CSV text.
pub fn to_csv(rows: &[SummaryRow]) -> Result<String> {
    let mut columns: Vec<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
    columns.sort_unstable();
    columns.dedup();

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&columns)?;
    for row in rows {
        wtr.write_record(columns.iter().map(|c| cell(row.get(*c))))?;
    }
    let bytes = wtr.into_inner().context("failed to flush summary CSV")?;
    String::from_utf8(bytes).context("summary CSV is not UTF-8")
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Outcome of a summarize pass.
#[derive(Debug, Clone)]
pub struct SummarizeReport {
    pub output: PathBuf,
    pub rows: usize,
}

/// Rank `<root>/summary.jsonl` and write `<root>/summary.csv`.
///
/// Returns `None` (and writes nothing) when the index is missing or empty.
pub fn summarize(root: &Path, key: SortKey, top: usize) -> Result<Option<SummarizeReport>> {
    let index = root.join(SUMMARY_INDEX);
    let rows = read_index(&index)?;
    if rows.is_empty() {
        warn!(path = %index.display(), "no runs recorded");
        return Ok(None);
    }
    let ranked = rank(rows, key, top);
    let output = root.join(SUMMARY_CSV);
    fs::write(&output, to_csv(&ranked)?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), rows = ranked.len(), sort_by = key.field(), "wrote summary");
    Ok(Some(SummarizeReport {
        output,
        rows: ranked.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> SummaryRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn ids(rows: &[SummaryRow]) -> Vec<&str> {
        rows.iter().map(|r| r["run_id"].as_str().unwrap()).collect()
    }

    fn sample() -> Vec<SummaryRow> {
        vec![
            row(json!({"run_id": "a", "sharpe": 0.5, "pnl": 0.10, "mdd": -0.20, "trades": 8, "run_ts": "2024-05-01T00:00:00Z"})),
            row(json!({"run_id": "b", "sharpe": 1.5, "pnl": -0.05, "mdd": -0.05, "trades": 2, "run_ts": "2024-05-03T00:00:00Z"})),
            row(json!({"run_id": "c", "sharpe": 1.0, "pnl": 0.30, "mdd": -0.40, "trades": 20, "run_ts": "2024-05-02T00:00:00Z"})),
        ]
    }

    #[test]
    fn sharpe_and_pnl_rank_descending() {
        assert_eq!(ids(&rank(sample(), SortKey::Sharpe, 10)), vec!["b", "c", "a"]);
        assert_eq!(ids(&rank(sample(), SortKey::Pnl, 10)), vec!["c", "a", "b"]);
    }

    #[test]
    fn mdd_and_trades_rank_ascending() {
        assert_eq!(ids(&rank(sample(), SortKey::Mdd, 10)), vec!["c", "a", "b"]);
        assert_eq!(ids(&rank(sample(), SortKey::Trades, 10)), vec!["b", "a", "c"]);
    }

    #[test]
    fn run_ts_ranks_newest_first() {
        assert_eq!(ids(&rank(sample(), SortKey::RunTs, 10)), vec!["b", "c", "a"]);
    }

    #[test]
    fn top_truncates() {
        assert_eq!(ids(&rank(sample(), SortKey::Sharpe, 1)), vec!["b"]);
    }

    #[test]
    fn missing_field_sorts_as_zero_and_ties_keep_order() {
        let rows = vec![
            row(json!({"run_id": "x", "sharpe": -1.0})),
            row(json!({"run_id": "y"})),
            row(json!({"run_id": "z", "sharpe": 0.0})),
        ];
        assert_eq!(ids(&rank(rows, SortKey::Sharpe, 10)), vec!["y", "z", "x"]);
    }

    #[test]
    fn sort_key_parses() {
        assert_eq!("Sharpe".parse::<SortKey>().unwrap(), SortKey::Sharpe);
        assert_eq!("run_ts".parse::<SortKey>().unwrap(), SortKey::RunTs);
        let err = "cagr".parse::<SortKey>().unwrap_err();
        assert_eq!(err, UnknownSortKey("cagr".into()));
        assert!(err.to_string().contains("expected sharpe"));
    }

    #[test]
    fn csv_uses_union_of_sorted_columns() {
        let rows = vec![
            row(json!({"run_id": "a", "sharpe": 1.0, "params": {"k": 1}})),
            row(json!({"run_id": "b", "extra": "note"})),
        ];
        let csv = to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("extra,params,run_id,sharpe"));
        assert_eq!(lines.next(), Some(r#","{""k"":1}",a,1.0"#));
        assert_eq!(lines.next(), Some("note,,b,"));
    }

    #[test]
    fn summarize_writes_csv_and_skips_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let lines = [
            r#"{"run_id":"a","sharpe":0.2}"#,
            "",
            "not json",
            "[1,2]",
            r#"{"run_id":"b","sharpe":0.9}"#,
        ];
        fs::write(tmp.path().join(SUMMARY_INDEX), lines.join("\n")).unwrap();

        let report = summarize(tmp.path(), SortKey::Sharpe, DEFAULT_TOP).unwrap().unwrap();
        assert_eq!(report.rows, 2);
        let csv = fs::read_to_string(&report.output).unwrap();
        assert_eq!(csv, "run_id,sharpe\nb,0.9\na,0.2\n");
    }

    #[test]
    fn summarize_without_index_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(summarize(tmp.path(), SortKey::Pnl, 10).unwrap().is_none());
        assert!(!tmp.path().join(SUMMARY_CSV).exists());
    }
}
