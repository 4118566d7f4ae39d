use serde::{Deserialize, Serialize};

use super::QTY_EPSILON;

/// Long-only position in the simulated instrument.
///
/// `avg_entry_price` is `None` exactly when `quantity == 0`. Fields are only
/// mutated by the fill logic in `engine::portfolio`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    quantity: f64,
    avg_entry_price: Option<f64>,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn avg_entry_price(&self) -> Option<f64> {
        self.avg_entry_price
    }

    pub fn is_flat(&self) -> bool {
        self.quantity <= 0.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Unrealized PnL as a fraction of the average entry price.
    pub fn unrealized_pct(&self, price: f64) -> Option<f64> {
        self.avg_entry_price
            .filter(|p| *p > 0.0)
            .map(|avg| price / avg - 1.0)
    }

    /// Add `qty` at `price`, updating the quantity-weighted average entry.
    pub(crate) fn add(&mut self, qty: f64, price: f64) {
        let avg = match self.avg_entry_price {
            Some(avg) if self.quantity > 0.0 => {
                (avg * self.quantity + price * qty) / (self.quantity + qty)
            }
            _ => price,
        };
        self.quantity += qty;
        self.avg_entry_price = Some(avg);
    }

    /// Remove `qty`. Returns true if the position is now flat, in which case
    /// the quantity is snapped to exactly zero and the average price cleared.
    pub(crate) fn reduce(&mut self, qty: f64) -> bool {
        self.quantity -= qty;
        if self.quantity <= QTY_EPSILON {
            self.quantity = 0.0;
            self.avg_entry_price = None;
            true
        } else {
            false
        }
    }
}
