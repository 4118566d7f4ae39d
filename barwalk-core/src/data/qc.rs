//! Bar quality scan.
//!
//! Counts the defects a bar table can carry past `BarSeries::new`: NaN
//! fields, inverted high/low, opens or closes outside the bar's range, and
//! bars missing from the resolution grid. The scan reports; it rejects
//! nothing.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::Bar;

/// At most this many missing timestamps are kept as examples.
pub const MISSING_EXAMPLES: usize = 10;

/// Defect counts for one bar table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarQc {
    pub rows: usize,
    /// NaN cells across open, high, low, close and volume.
    pub nan_values: usize,
    /// Bars with `high < low`.
    pub bad_hilo: usize,
    pub open_out_of_range: usize,
    pub close_out_of_range: usize,
    /// Grid slots between the first and last bar that have no bar.
    pub missing_bars: usize,
    pub missing_examples: Vec<DateTime<Utc>>,
}

impl BarQc {
    /// Scan `bars`, expecting one bar every `step`.
    ///
    /// Gaps are only counted between increasing timestamps; ordering errors
    /// are left to `BarSeries::new`.
    pub fn scan(bars: &[Bar], step: Duration) -> Self {
        let mut qc = BarQc {
            rows: bars.len(),
            ..Self::default()
        };

        for bar in bars {
            qc.nan_values += [bar.open, bar.high, bar.low, bar.close, bar.volume]
                .iter()
                .filter(|v| v.is_nan())
                .count();
            if bar.high < bar.low {
                qc.bad_hilo += 1;
            }
            if bar.open < bar.low || bar.open > bar.high {
                qc.open_out_of_range += 1;
            }
            if bar.close < bar.low || bar.close > bar.high {
                qc.close_out_of_range += 1;
            }
        }

        let step_secs = step.num_seconds();
        if step_secs > 0 {
            for pair in bars.windows(2) {
                let gap = (pair[1].timestamp - pair[0].timestamp).num_seconds();
                if gap <= step_secs {
                    continue;
                }
                let skipped = ((gap - 1) / step_secs) as usize;
                for k in 1..=skipped {
                    if qc.missing_examples.len() >= MISSING_EXAMPLES {
                        break;
                    }
                    qc.missing_examples.push(pair[0].timestamp + step * k as i32);
                }
                qc.missing_bars += skipped;
            }
        }

        qc
    }

    /// Bars (or cells, for NaNs) flagged by any check.
    pub fn issue_count(&self) -> usize {
        self.nan_values
            + self.bad_hilo
            + self.open_out_of_range
            + self.close_out_of_range
            + self.missing_bars
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }
}
