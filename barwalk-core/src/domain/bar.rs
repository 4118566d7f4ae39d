//! Bar, the fundamental market data unit, plus the validated bar table and
//! the blinded history view handed to decision functions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

use super::features::FeatureSet;

/// OHLCV bar for one instrument at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// An ordered, timestamp-unique bar table plus its feature columns.
///
/// Construction validates the table once; afterwards it is immutable apart
/// from appending feature columns, which must match the bar count.
/// Deserialization goes through the same validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBarSeries")]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
    features: FeatureSet,
}

/// Unvalidated wire form of [`BarSeries`].
#[derive(Deserialize)]
struct RawBarSeries {
    symbol: String,
    bars: Vec<Bar>,
    #[serde(default)]
    features: FeatureSet,
}

impl TryFrom<RawBarSeries> for BarSeries {
    type Error = DataError;

    fn try_from(raw: RawBarSeries) -> Result<Self, Self::Error> {
        let mut series = BarSeries::new(raw.symbol, raw.bars)?;
        for (name, values) in raw.features.into_columns() {
            series.insert_feature(name, values)?;
        }
        Ok(series)
    }
}

impl BarSeries {
    /// Validate and wrap a bar table.
    ///
    /// Fails if the table is empty, timestamps are not strictly increasing,
    /// or an open/close price is non-finite or non-positive (opens are the
    /// execution basis, closes the marking basis).
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        if bars.is_empty() {
            return Err(DataError::Empty);
        }
        for (index, bar) in bars.iter().enumerate() {
            for (field, value) in [("open", bar.open), ("close", bar.close)] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(DataError::InvalidPrice {
                        index,
                        timestamp: bar.timestamp,
                        field,
                        value,
                    });
                }
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(DataError::NonIncreasingTimestamp {
                        index,
                        timestamp: bar.timestamp,
                        previous,
                    });
                }
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
            features: FeatureSet::new(),
        })
    }

    /// Append (or replace) a feature column.
    pub fn insert_feature(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), DataError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(DataError::FeatureLength {
                name,
                expected: self.bars.len(),
                actual: values.len(),
            });
        }
        self.features.insert(name, values);
        Ok(())
    }

    /// Builder form of [`insert_feature`](Self::insert_feature).
    pub fn with_feature(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, DataError> {
        self.insert_feature(name, values)?;
        Ok(self)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> DateTime<Utc> {
        self.bars[0].timestamp
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.bars[self.bars.len() - 1].timestamp
    }

    /// Everything known at the close of bar `index`: bars `0..=index` and
    /// their feature values.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn history(&self, index: usize) -> History<'_> {
        assert!(
            index < self.bars.len(),
            "history index {index} out of range for {} bars",
            self.bars.len()
        );
        History {
            bars: &self.bars[..=index],
            features: &self.features,
        }
    }
}

/// Read-only view of the bar table up to and including the decision bar.
///
/// Nothing past the decision bar is reachable through this type: the bar slice
/// is truncated, and feature lookups are bounded by the same length.
#[derive(Debug, Clone, Copy)]
pub struct History<'a> {
    bars: &'a [Bar],
    features: &'a FeatureSet,
}

impl<'a> History<'a> {
    /// Number of visible bars (decision bar index + 1).
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Never true: a history always contains its decision bar.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Index of the decision bar within the full table.
    pub fn index(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    /// The decision bar.
    pub fn last(&self) -> &'a Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// Bar `n` positions before the decision bar (`ago(0)` is the decision bar).
    pub fn ago(&self, n: usize) -> Option<&'a Bar> {
        self.index().checked_sub(n).map(|i| &self.bars[i])
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.last().timestamp
    }

    /// Feature value at the decision bar.
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name, self.index())
    }

    /// Feature value `n` bars before the decision bar.
    pub fn feature_ago(&self, name: &str, n: usize) -> Option<f64> {
        let idx = self.index().checked_sub(n)?;
        self.features.get(name, idx)
    }

    /// A feature column truncated to the visible bars.
    pub fn feature_series(&self, name: &str) -> Option<&'a [f64]> {
        self.features.column(name).map(|c| &c[..self.bars.len()])
    }

    /// Closing prices of the visible bars.
    pub fn closes(&self) -> impl Iterator<Item = f64> + 'a {
        self.bars.iter().map(|b| b.close)
    }
}
