//! Trailing stop order that follows the price up and sells on a retrace.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How far below the watermark the stop sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TrailDistance {
    /// Fixed price distance
    Absolute(Decimal),
    /// Fraction of the watermark (0.10 = 10%)
    Percent(Decimal),
}

impl TrailDistance {
    /// Build from user input, where a percentage is given in whole percent ("10" = 10%).
    pub fn from_input(distance: Decimal, is_percentage: bool) -> Self {
        if is_percentage {
            TrailDistance::Percent(distance / dec!(100))
        } else {
            TrailDistance::Absolute(distance)
        }
    }

    /// Stop price for a given watermark.
    ///
    /// A percentage trail whose product overflows sits below any price, so it
    /// saturates to `Decimal::MIN`.
    pub fn stop_price(&self, watermark: Decimal) -> Decimal {
        match self {
            TrailDistance::Absolute(points) => watermark.saturating_sub(*points),
            TrailDistance::Percent(fraction) => watermark
                .checked_mul(*fraction)
                .and_then(|drop| watermark.checked_sub(drop))
                .unwrap_or(Decimal::MIN),
        }
    }

    pub fn is_percentage(&self) -> bool {
        matches!(self, TrailDistance::Percent(_))
    }
}

/// Result of feeding one price to a trailing stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingStopState {
    /// New high; the watermark moved up
    Rising,
    /// Below the watermark but above the stop
    Correcting,
    /// At or below the stop; the order must execute
    Triggered,
}

/// Automated sell order tracking the highest price seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopOrder {
    /// Shares to sell when triggered
    pub quantity: Decimal,

    /// Distance from the watermark to the stop
    pub distance: TrailDistance,

    /// Highest price observed since placement. Never decreases.
    pub highest_price_seen: Decimal,
}

impl TrailingStopOrder {
    pub fn new(quantity: Decimal, distance: TrailDistance, current_price: Decimal) -> Self {
        Self {
            quantity,
            distance,
            highest_price_seen: current_price,
        }
    }

    /// Fold another placement into this order: quantities add, the distance is replaced.
    pub fn merge(&mut self, quantity: Decimal, distance: TrailDistance) {
        self.quantity += quantity;
        self.distance = distance;
    }

    /// Current stop price.
    pub fn stop_price(&self) -> Decimal {
        self.distance.stop_price(self.highest_price_seen)
    }

    /// Observe a new price and report what the order should do.
    pub fn observe(&mut self, price: Decimal) -> TrailingStopState {
        if price > self.highest_price_seen {
            self.highest_price_seen = price;
            return TrailingStopState::Rising;
        }

        if price <= self.stop_price() {
            TrailingStopState::Triggered
        } else {
            TrailingStopState::Correcting
        }
    }
}
