//! Holding model representing the shares of one ticker held by the account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TrailingStopOrder;

/// Shares of a single ticker currently held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol
    pub ticker: String,

    /// Number of shares held
    pub quantity: Decimal,

    /// Volume-weighted average purchase price
    pub average_cost: Decimal,

    /// Most recent observed price
    pub current_price: Decimal,

    /// Active trailing stop covering some or all of the shares
    #[serde(default)]
    pub trailing_stop: Option<TrailingStopOrder>,
}

impl Holding {
    /// Open a holding from its first buy fill.
    pub fn new(ticker: impl Into<String>, quantity: Decimal, price: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            quantity,
            average_cost: price,
            current_price: price,
            trailing_stop: None,
        }
    }

    /// Add a buy fill, re-averaging the cost. Returns the new average cost, or
    /// `None` without touching the holding if the totals overflow.
    pub fn add(&mut self, quantity: Decimal, price: Decimal) -> Option<Decimal> {
        let total_cost = self
            .quantity
            .checked_mul(self.average_cost)?
            .checked_add(quantity.checked_mul(price)?)?;
        let new_quantity = self.quantity.checked_add(quantity)?;

        if !new_quantity.is_zero() {
            self.average_cost = total_cost.checked_div(new_quantity)?;
        }

        self.quantity = new_quantity;
        Some(self.average_cost)
    }

    /// Remove sold shares. Average cost is unaffected.
    ///
    /// An attached trailing stop never covers more shares than remain.
    pub fn reduce(&mut self, quantity: Decimal) {
        self.quantity -= quantity;

        if let Some(order) = self.trailing_stop.as_mut() {
            if order.quantity > self.quantity {
                order.quantity = self.quantity;
            }
        }
    }

    /// Record the latest market price.
    pub fn update_price(&mut self, current_price: Decimal) {
        self.current_price = current_price;
    }

    /// Check if nothing is left of this holding.
    pub fn is_closed(&self) -> bool {
        self.quantity <= Decimal::ZERO
    }

    /// Market value at the current price, `None` on overflow.
    pub fn market_value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.current_price)
    }

    /// Return relative to average cost, as a fraction. `None` on overflow.
    pub fn return_pct(&self) -> Option<Decimal> {
        if self.average_cost.is_zero() {
            return Some(Decimal::ZERO);
        }
        self.current_price
            .checked_sub(self.average_cost)?
            .checked_div(self.average_cost)
    }
}
