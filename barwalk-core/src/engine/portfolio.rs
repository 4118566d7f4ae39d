//! Portfolio accountant: cash, the single long position, and fill counters.
//!
//! Every mutation goes through [`Portfolio::buy`] or [`Portfolio::sell`],
//! which check the bookkeeping invariants before returning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cost_model::CostModel;
use crate::domain::{Position, Side, QTY_EPSILON};
use crate::error::InvariantViolation;

/// Cash may dip this far below zero from rounding before it is an error.
const CASH_TOLERANCE: f64 = 1e-9;

/// One executed fill as seen by the accountant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub notional: f64,
    pub fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    cash: f64,
    position: Position,
    fill_count: usize,
    round_trip_count: usize,
    /// Set on the flat -> long transition, cleared when flat again.
    position_open: bool,
    last_fill: Option<(DateTime<Utc>, f64)>,
    fees_paid: f64,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            position: Position::flat(),
            fill_count: 0,
            round_trip_count: 0,
            position_open: false,
            last_fill: None,
            fees_paid: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    pub fn round_trip_count(&self) -> usize {
        self.round_trip_count
    }

    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    pub fn last_fill_ts(&self) -> Option<DateTime<Utc>> {
        self.last_fill.map(|(ts, _)| ts)
    }

    pub fn last_fill_price(&self) -> Option<f64> {
        self.last_fill.map(|(_, px)| px)
    }

    /// Mark-to-market equity at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    /// Position value as a fraction of equity at `price` (0 if equity <= 0).
    pub fn weight(&self, price: f64) -> f64 {
        let equity = self.equity(price);
        if equity <= 0.0 {
            0.0
        } else {
            self.position.market_value(price) / equity
        }
    }

    /// Buy up to `desired_qty` at `raw_price` plus slippage, limited by cash.
    ///
    /// Returns `None` when the affordable quantity is negligible.
    pub fn buy(
        &mut self,
        at: DateTime<Utc>,
        desired_qty: f64,
        raw_price: f64,
        cost: &CostModel,
    ) -> Result<Option<Execution>, InvariantViolation> {
        let price = cost.buy_price(raw_price);
        let quantity = desired_qty.min(cost.affordable_qty(self.cash, price));
        if quantity <= QTY_EPSILON {
            return Ok(None);
        }
        let notional = quantity * price;
        let fee = cost.fee(notional);

        self.cash -= notional + fee;
        if self.cash < 0.0 {
            if self.cash < -CASH_TOLERANCE * notional.max(1.0) {
                return Err(InvariantViolation::NegativeCash(self.cash));
            }
            self.cash = 0.0;
        }
        self.position.add(quantity, price);
        self.fees_paid += fee;
        self.fill_count += 1;
        self.last_fill = Some((at, price));
        if !self.position_open && self.position.quantity() > 0.0 {
            self.position_open = true;
        }
        self.check_invariants()?;

        Ok(Some(Execution {
            side: Side::Buy,
            quantity,
            price,
            notional,
            fee,
        }))
    }

    /// Sell up to `desired_qty` (never more than held) at `raw_price` minus
    /// slippage. Closing the position completes a round trip.
    pub fn sell(
        &mut self,
        at: DateTime<Utc>,
        desired_qty: f64,
        raw_price: f64,
        cost: &CostModel,
    ) -> Result<Option<Execution>, InvariantViolation> {
        let quantity = desired_qty.min(self.position.quantity());
        if quantity <= QTY_EPSILON {
            return Ok(None);
        }
        let price = cost.sell_price(raw_price);
        let notional = quantity * price;
        let fee = cost.fee(notional);

        self.cash += notional - fee;
        let now_flat = self.position.reduce(quantity);
        if now_flat && self.position_open {
            self.round_trip_count += 1;
            self.position_open = false;
        }
        self.fees_paid += fee;
        self.fill_count += 1;
        self.last_fill = Some((at, price));
        self.check_invariants()?;

        Ok(Some(Execution {
            side: Side::Sell,
            quantity,
            price,
            notional,
            fee,
        }))
    }

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let qty = self.position.quantity();
        if qty < 0.0 {
            return Err(InvariantViolation::NegativeQuantity(qty));
        }
        let has_price = self.position.avg_entry_price().is_some();
        if has_price != (qty > 0.0) {
            return Err(InvariantViolation::AvgPriceMismatch {
                quantity: qty,
                has_price,
            });
        }
        Ok(())
    }
}
