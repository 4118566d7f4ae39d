//! Bar loading for the runner.
//!
//! Bars come from one of two places, selected by `[data]` in the run config:
//! 1. A CSV file with a `timestamp,open,high,low,close,volume` header
//! 2. The seeded synthetic generator in `barwalk_core::data`
//!
//! Either way the bars are cut to the configured `[start, end)` window and
//! validated by `BarSeries::new`, so ordering and duplicate problems surface as
//! `DataError` before the engine runs. Softer defects (inverted ranges, NaN
//! highs, gaps in the grid) are counted by `BarQc` and logged as warnings.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use barwalk_core::data::{BarQc, SyntheticBars};
use barwalk_core::{Bar, BarSeries, DataError};

use crate::config::{DataSource, RunConfig, RunConfigError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open bar file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed bar row {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("bar row {line}: unrecognized timestamp '{value}'")]
    Timestamp { line: u64, value: String },

    #[error(transparent)]
    Config(#[from] RunConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// One CSV row as written by common exchange exports.
#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Parse a bar timestamp.
///
/// Accepts RFC 3339 (`2024-01-01T00:05:00Z`), a naive `YYYY-MM-DD HH:MM:SS`
/// or `YYYY-MM-DDTHH:MM:SS` taken as UTC, a bare `YYYY-MM-DD` (midnight
/// UTC), and integer epoch seconds or milliseconds.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    if let Ok(epoch) = value.parse::<i64>() {
        // Anything past 1e11 seconds is year 5138; read it as milliseconds.
        return if epoch.abs() >= 100_000_000_000 {
            Utc.timestamp_millis_opt(epoch).single()
        } else {
            Utc.timestamp_opt(epoch, 0).single()
        };
    }
    None
}

/// Read bars from any CSV source with a header row.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (i, row) in rdr.deserialize::<CsvBar>().enumerate() {
        // Header is line 1.
        let line = i as u64 + 2;
        let row = row.map_err(|source| LoadError::Row { line, source })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            line,
            value: row.timestamp.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

/// Read bars from a CSV file.
pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Open {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    read_bars(file)
}

/// Keep bars with `start <= timestamp < end`. Missing bounds are open.
pub fn filter_window(
    bars: Vec<Bar>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| start.map_or(true, |s| b.timestamp >= s))
        .filter(|b| end.map_or(true, |e| b.timestamp < e))
        .collect()
}

/// Scan bars for quality defects and warn about any found.
pub fn check_quality(symbol: &str, bars: &[Bar], step: Duration) -> BarQc {
    let qc = BarQc::scan(bars, step);
    if qc.is_clean() {
        debug!(symbol, rows = qc.rows, "bar qc clean");
    } else {
        warn!(
            symbol,
            rows = qc.rows,
            nan_values = qc.nan_values,
            bad_hilo = qc.bad_hilo,
            open_out_of_range = qc.open_out_of_range,
            close_out_of_range = qc.close_out_of_range,
            missing_bars = qc.missing_bars,
            first_missing = ?qc.missing_examples.first(),
            "bar qc found defects"
        );
    }
    qc
}

/// Load and validate the bar series a run config points at.
///
/// The returned series carries no feature columns yet.
pub fn load_series(config: &RunConfig) -> Result<BarSeries, LoadError> {
    let (start, end) = config.window();
    let resolution = config.resolution().map_err(RunConfigError::from)?;
    let bars = match config.data_source()? {
        DataSource::Csv(path) => {
            let bars = read_bars_csv(&path)?;
            debug!(path = %path.display(), rows = bars.len(), "read bar file");
            bars
        }
        DataSource::Synthetic { bars, seed } => {
            let mut generator = SyntheticBars::new(bars, seed)
                .with_symbol(config.run.symbol.clone())
                .with_resolution(resolution);
            if let Some(s) = start {
                generator.start = s;
            }
            generator.generate()
        }
    };
    let bars = filter_window(bars, start, end);
    check_quality(&config.run.symbol, &bars, resolution.duration());
    info!(symbol = %config.run.symbol, bars = bars.len(), "loaded bars");
    Ok(BarSeries::new(config.run.symbol.clone(), bars)?)
}
