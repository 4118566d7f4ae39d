//! The decision a strategy returns for one bar.
//!
//! A decision is a signal plus an optional target weight. Loosely shaped
//! decisions (JSON pairs or maps produced by scripted strategies) are
//! normalized here once; anything unrecognizable becomes a plain hold.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown signal '{0}'")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Signal::Buy),
            "sell" => Ok(Signal::Sell),
            "hold" => Ok(Signal::Hold),
            _ => Err(UnknownSignal(s.to_string())),
        }
    }
}

/// A validated decision: `{signal, weight}`.
///
/// `weight` is the requested fraction of equity to hold after the fill. A
/// non-finite weight is dropped at construction; range clamping happens when
/// the engine resolves the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub signal: Signal,
    pub weight: Option<f64>,
}

impl Decision {
    pub fn new(signal: Signal, weight: Option<f64>) -> Self {
        Self {
            signal,
            weight: weight.filter(|w| w.is_finite()),
        }
    }

    /// Buy up to `weight` of equity.
    pub fn buy(weight: f64) -> Self {
        Self::new(Signal::Buy, Some(weight))
    }

    /// Sell to flat.
    pub fn sell() -> Self {
        Self::new(Signal::Sell, None)
    }

    /// Keep the current allocation.
    pub fn hold() -> Self {
        Self::new(Signal::Hold, None)
    }

    /// Hold, but rebalance to `weight`.
    pub fn hold_at(weight: f64) -> Self {
        Self::new(Signal::Hold, Some(weight))
    }

    pub fn is_hold(&self) -> bool {
        self.signal == Signal::Hold && self.weight.is_none()
    }

    /// Resolve the target weight given the current weight and the cap.
    ///
    /// buy defaults to full allocation, sell to flat, hold to the current
    /// weight. Explicit weights are clamped to `[0, cap]`.
    pub fn target_weight(&self, current: f64, cap: f64) -> f64 {
        let explicit = self.weight.map(|w| w.clamp(0.0, cap));
        match self.signal {
            Signal::Buy => explicit.unwrap_or(cap),
            Signal::Sell => explicit.unwrap_or(0.0),
            Signal::Hold => explicit.unwrap_or(current),
        }
    }

    /// Parse a loosely shaped decision.
    ///
    /// Accepted shapes: `["buy", 0.5]`, `["sell"]`, `["hold", null]`,
    /// `{"signal": "buy", "weight": 0.5}`. Returns `None` for anything else,
    /// including an unrecognized signal name.
    pub fn try_from_value(value: &Value) -> Option<Self> {
        let (signal, weight) = match value {
            Value::Array(items) => (items.first()?, items.get(1)),
            Value::Object(map) => (
                map.get("signal").unwrap_or(&Value::Null),
                map.get("weight"),
            ),
            _ => return None,
        };
        let signal = match signal {
            Value::String(s) => s.parse::<Signal>().ok()?,
            // a map without a signal key means hold
            Value::Null if value.is_object() => Signal::Hold,
            _ => return None,
        };
        let weight = match weight {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => return None,
        };
        Some(Self::new(signal, weight))
    }

    /// Like [`try_from_value`](Self::try_from_value), but degrades to hold.
    pub fn from_value(value: &Value) -> Self {
        Self::try_from_value(value).unwrap_or_else(|| {
            warn!(decision = %value, "malformed decision treated as hold");
            Self::hold()
        })
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::hold()
    }
}

impl From<Signal> for Decision {
    fn from(signal: Signal) -> Self {
        Self::new(signal, None)
    }
}

impl From<(Signal, Option<f64>)> for Decision {
    fn from((signal, weight): (Signal, Option<f64>)) -> Self {
        Self::new(signal, weight)
    }
}

impl From<Value> for Decision {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signal_parse_is_case_insensitive() {
        assert_eq!("BUY".parse::<Signal>().unwrap(), Signal::Buy);
        assert_eq!(" Sell ".parse::<Signal>().unwrap(), Signal::Sell);
        assert!("short".parse::<Signal>().is_err());
    }

    #[test]
    fn pair_shapes() {
        assert_eq!(Decision::from_value(&json!(["buy", 0.5])), Decision::buy(0.5));
        assert_eq!(Decision::from_value(&json!(["sell"])), Decision::sell());
        assert_eq!(Decision::from_value(&json!(["hold", null])), Decision::hold());
    }

    #[test]
    fn map_shapes() {
        assert_eq!(
            Decision::from_value(&json!({"signal": "Buy", "weight": 0.25})),
            Decision::buy(0.25)
        );
        assert_eq!(Decision::from_value(&json!({"weight": 0.25})), Decision::hold_at(0.25));
    }

    #[test]
    fn malformed_shapes_become_hold() {
        for value in [
            json!("buy"),
            json!(1.0),
            json!(null),
            json!([]),
            json!(["moon", 1.0]),
            json!([1, 2]),
            json!({"signal": "buy", "weight": "lots"}),
        ] {
            assert!(Decision::try_from_value(&value).is_none(), "{value} accepted");
            assert_eq!(Decision::from_value(&value), Decision::hold());
        }
    }

    #[test]
    fn non_finite_weight_dropped() {
        assert_eq!(Decision::new(Signal::Hold, Some(f64::NAN)).weight, None);
    }

    #[test]
    fn deserialize_never_fails() {
        let d: Decision = serde_json::from_str(r#"["sell", 0.0]"#).unwrap();
        assert_eq!(d, Decision::new(Signal::Sell, Some(0.0)));
        let d: Decision = serde_json::from_str(r#""garbage""#).unwrap();
        assert!(d.is_hold());
    }

    #[test]
    fn target_weight_resolution() {
        assert_eq!(Decision::buy(0.4).target_weight(0.1, 1.0), 0.4);
        assert_eq!(Decision::from(Signal::Buy).target_weight(0.1, 1.0), 1.0);
        assert_eq!(Decision::from(Signal::Buy).target_weight(0.1, 0.5), 0.5);
        assert_eq!(Decision::sell().target_weight(0.7, 1.0), 0.0);
        assert_eq!(Decision::hold().target_weight(0.7, 1.0), 0.7);
        assert_eq!(Decision::hold_at(0.3).target_weight(0.7, 1.0), 0.3);
        assert_eq!(Decision::buy(1.7).target_weight(0.0, 1.0), 1.0);
        assert_eq!(Decision::buy(-0.2).target_weight(0.5, 1.0), 0.0);
    }
}
