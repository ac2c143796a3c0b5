//! Replay of scripted price ticks and orders against an account.
//!
//! A scenario is a JSON document:
//!
//! ```json
//! {
//!   "ticks": [
//!     { "ticker": "AAPL", "prices": { "AAPL": "100" },
//!       "actions": [ { "action": "buy", "ticker": "AAPL", "quantity": 10 } ] }
//!   ],
//!   "liquidate_at_end": true
//! }
//! ```
//!
//! Each tick first updates prices, then applies its actions in order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{Account, AccountError, PriceSnapshot};
use crate::models::{Fill, SellQuantity};

/// A scripted simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub ticks: Vec<Tick>,

    /// Sell everything after the last tick
    #[serde(default)]
    pub liquidate_at_end: bool,
}

/// One simulated time step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    /// Ticker that produced this snapshot
    pub ticker: String,

    /// Full price table for this step
    pub prices: PriceSnapshot,

    #[serde(default)]
    pub actions: Vec<Action>,
}

/// An order issued by the caller during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Buy {
        ticker: String,
        quantity: Decimal,
    },
    Sell {
        ticker: String,
        quantity: SellQuantity,
    },
    TrailingStop {
        ticker: String,
        quantity: Decimal,
        distance: Decimal,
        #[serde(default)]
        percentage: bool,
    },
    SellAll,
}

impl Action {
    /// Apply this action, returning any fills it produced.
    pub fn apply(&self, account: &mut Account) -> Result<Vec<Fill>, AccountError> {
        match self {
            Action::Buy { ticker, quantity } => account.buy(ticker, *quantity).map(|f| vec![f]),
            Action::Sell { ticker, quantity } => account.sell(ticker, *quantity).map(|f| vec![f]),
            Action::TrailingStop {
                ticker,
                quantity,
                distance,
                percentage,
            } => account
                .set_trailing_stop(ticker, *quantity, *distance, *percentage)
                .map(|_| Vec::new()),
            Action::SellAll => account.sell_all(),
        }
    }
}

/// An action the account refused.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub tick: usize,
    pub action: Action,
    pub error: AccountError,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub ticks: usize,
    /// Fills from caller actions, including the final liquidation
    pub order_fills: usize,
    /// Fills from triggered trailing stops
    pub triggered_fills: usize,
    pub rejections: Vec<Rejection>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Drive `account` through every tick.
    ///
    /// A rejected action is logged and skipped, or aborts the replay when
    /// `strict` is set. A tick whose trigger ticker is missing from its own
    /// snapshot always aborts.
    pub fn replay(&self, account: &mut Account, strict: bool) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        info!(ticks = self.ticks.len(), strict = strict, "Starting replay");

        for (index, tick) in self.ticks.iter().enumerate() {
            let triggered = account
                .update(tick.prices.clone(), &tick.ticker)
                .with_context(|| format!("Tick {}: price update failed", index))?;
            summary.triggered_fills += triggered.len();

            for action in &tick.actions {
                match action.apply(account) {
                    Ok(fills) => summary.order_fills += fills.len(),
                    Err(error) if strict => {
                        return Err(anyhow::Error::new(error)
                            .context(format!("Tick {}: {:?} rejected", index, action)));
                    }
                    Err(error) => {
                        warn!(tick = index, action = ?action, error = %error, "Action rejected");
                        summary.rejections.push(Rejection {
                            tick: index,
                            action: action.clone(),
                            error,
                        });
                    }
                }
            }

            summary.ticks += 1;
            debug!(tick = index, funds = %account.funds(), "Tick complete");
        }

        if self.liquidate_at_end {
            summary.order_fills += account.sell_all()?.len();
        }

        info!(
            ticks = summary.ticks,
            order_fills = summary.order_fills,
            triggered_fills = summary.triggered_fills,
            rejected = summary.rejections.len(),
            "Replay finished"
        );

        Ok(summary)
    }
}
