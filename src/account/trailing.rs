//! Trailing stop placement and per-tick evaluation.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::error::ensure_positive;
use super::{Account, AccountError};
use crate::models::{Fill, FillReason, TrailDistance, TrailingStopOrder, TrailingStopState};

impl Account {
    /// Place a trailing stop on a held ticker, or merge into the existing one.
    ///
    /// With `is_percentage`, `distance` is whole percent ("10" trails 10% below
    /// the watermark). Merging adds the quantity and replaces the distance.
    /// No fee is charged here, but funds must cover the fee of the eventual
    /// sale. On error nothing is changed.
    pub fn set_trailing_stop(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        distance: Decimal,
        is_percentage: bool,
    ) -> Result<TrailingStopOrder, AccountError> {
        ensure_positive(quantity)?;
        if distance < Decimal::ZERO {
            return Err(AccountError::InvalidDistance { distance });
        }

        if self.funds < self.transaction_fee {
            return Err(AccountError::InsufficientFunds {
                ticker: ticker.to_string(),
                required: self.transaction_fee,
                available: self.funds,
            });
        }

        let holding = self
            .holdings
            .get_mut(ticker)
            .ok_or_else(|| AccountError::NotOwned {
                ticker: ticker.to_string(),
            })?;

        let ordered = holding
            .trailing_stop
            .as_ref()
            .map_or(Decimal::ZERO, |order| order.quantity)
            .checked_add(quantity);
        match ordered {
            Some(ordered) if ordered <= holding.quantity => {}
            _ => {
                return Err(AccountError::OrderExceedsHoldings {
                    ticker: ticker.to_string(),
                    ordered: ordered.unwrap_or(Decimal::MAX),
                    owned: holding.quantity,
                });
            }
        }

        let distance = TrailDistance::from_input(distance, is_percentage);
        let order = match holding.trailing_stop.take() {
            Some(mut order) => {
                order.merge(quantity, distance);
                order
            }
            None => TrailingStopOrder::new(quantity, distance, holding.current_price),
        };
        holding.trailing_stop = Some(order.clone());

        info!(
            ticker = %ticker,
            quantity = %order.quantity,
            distance = ?order.distance,
            percentage = order.distance.is_percentage(),
            stop = %order.stop_price(),
            "Trailing stop set"
        );

        Ok(order)
    }

    /// Feed the holding's current price to its trailing stop, selling the
    /// covered shares if the stop is hit. A triggered sale that cannot be
    /// settled leaves the order in place.
    pub(super) fn evaluate_trailing_stop(&mut self, ticker: &str) -> Option<Fill> {
        let holding = self.holdings.get_mut(ticker)?;
        let price = holding.current_price;
        let order = holding.trailing_stop.as_mut()?;

        match order.observe(price) {
            TrailingStopState::Rising => {
                debug!(ticker = %ticker, watermark = %price, "Trailing stop watermark raised");
                None
            }
            TrailingStopState::Correcting => None,
            TrailingStopState::Triggered => {
                let quantity = order.quantity.min(holding.quantity);
                let stop = order.stop_price();

                warn!(
                    ticker = %ticker,
                    price = %price,
                    stop = %stop,
                    quantity = %quantity,
                    "Trailing stop triggered"
                );

                match self.settle_sell(ticker, quantity, price, FillReason::TrailingStop) {
                    Ok(fill) => {
                        if let Some(holding) = self.holdings.get_mut(ticker) {
                            holding.trailing_stop = None;
                        }
                        Some(fill)
                    }
                    Err(error) => {
                        warn!(ticker = %ticker, error = %error, "Trailing stop sale failed");
                        None
                    }
                }
            }
        }
    }
}
