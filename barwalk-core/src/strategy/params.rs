//! Free-form strategy parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Named strategy parameters with typed getters.
///
/// Strategies read what they need and fall back to their own defaults when a
/// key is missing or has the wrong type. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyParams(BTreeMap<String, Value>);

impl StrategyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge `other` over `self`; keys in `other` win.
    pub fn merged(mut self, other: &StrategyParams) -> Self {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| v as usize)
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as usize))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Parse one `key=value` pair.
    ///
    /// The value becomes a bool (`true`/`false`, any case), an integer, a
    /// float, or else a string.
    pub fn parse_kv(pair: &str) -> Result<(String, Value), ConfigError> {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedParam(pair.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::MalformedParam(pair.to_string()));
        }
        let raw = raw.trim();
        let value = if raw.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else if let Ok(i) = raw.parse::<i64>() {
            Value::from(i)
        } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
            Value::from(f)
        } else {
            Value::String(raw.to_string())
        };
        Ok((key.to_string(), value))
    }

    /// Build from a list of `key=value` pairs; later pairs override earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let (k, v) = Self::parse_kv(pair.as_ref())?;
            params.0.insert(k, v);
        }
        Ok(params)
    }
}

impl FromIterator<(String, Value)> for StrategyParams {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
