//! Feature columns appended to a bar table before simulation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric columns aligned index-for-index with a bar table.
///
/// Built once before the bar loop by the feature provider, then only read.
/// Missing values (warmup) are `f64::NAN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a named column. Length is checked by `BarSeries`.
    pub(crate) fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    /// Consume the set, yielding its columns in name order.
    pub(crate) fn into_columns(self) -> impl Iterator<Item = (String, Vec<f64>)> {
        self.columns.into_iter()
    }

    /// Value of a column at a bar index.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.columns.get(name).and_then(|v| v.get(index).copied())
    }

    /// The full column.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
