//! Built-in strategies.
//!
//! Each is a plain [`Strategy`](crate::strategy::Strategy) implementation
//! registered in [`StrategyKind`](crate::strategy::StrategyKind).

pub mod align_macd;
pub mod bucketed;
pub mod buy_and_hold;
pub mod sma_cross;
pub mod sma_macd_atr;

pub use align_macd::AlignMacd;
pub use bucketed::{BucketParams, BucketState, BucketedAllocation};
pub use buy_and_hold::BuyAndHold;
pub use sma_cross::SmaCross;
pub use sma_macd_atr::{ChandelierState, SmaMacdAtr};

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::{DateTime, Utc};

    use crate::data::bars_from_closes;
    use crate::domain::BarSeries;
    use crate::strategy::Context;

    /// A series of `n` bars at `price` with every named feature held constant.
    pub fn flat_series(n: usize, price: f64, features: &[(&str, f64)]) -> BarSeries {
        let mut series = BarSeries::new("TEST", bars_from_closes(&vec![price; n])).unwrap();
        for (name, value) in features {
            series.insert_feature(*name, vec![*value; n]).unwrap();
        }
        series
    }

    pub fn flat_ctx(now: DateTime<Utc>, cash: f64, price: f64) -> Context {
        Context {
            now,
            position_qty: 0.0,
            position_avg_price: None,
            cash,
            equity: cash,
            last_price: price,
            last_fill_ts: None,
            last_fill_price: None,
        }
    }

    pub fn long_ctx(now: DateTime<Utc>, cash: f64, qty: f64, avg: f64, price: f64) -> Context {
        Context {
            now,
            position_qty: qty,
            position_avg_price: Some(avg),
            cash,
            equity: cash + qty * price,
            last_price: price,
            last_fill_ts: None,
            last_fill_price: Some(avg),
        }
    }
}
