//! Performance report for an account.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::error::checked;
use super::{Account, AccountError};

/// Per-holding line of a verbose report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingSummary {
    pub ticker: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub return_pct: Decimal,
}

/// Snapshot of account performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReport {
    pub initial_funds: Decimal,
    pub funds: Decimal,
    pub holdings_value: Decimal,
    pub net_worth: Decimal,
    pub profit: Decimal,
    pub profit_pct: Decimal,
    /// Fees paid across every fill
    pub total_fees: Decimal,
    /// Return of holding one share of every recorded ticker since first seen.
    /// `None` before any original price is recorded.
    pub market_return: Option<Decimal>,
    /// Only present in verbose reports
    pub holdings: Option<Vec<HoldingSummary>>,
    pub transaction_count: u64,
}

impl Account {
    /// Build a performance report. Fails if a ticker with a recorded original
    /// price is missing from the latest snapshot, or if a figure overflows.
    pub fn report(&self, verbose: bool) -> Result<AccountReport, AccountError> {
        let holdings_value = self.value()?;
        let net_worth = checked(self.funds.checked_add(holdings_value), "net worth")?;
        let profit = checked(net_worth.checked_sub(self.initial_funds), "profit")?;
        let profit_pct = if self.initial_funds.is_zero() {
            Decimal::ZERO
        } else {
            checked(profit.checked_div(self.initial_funds), "return percentage")?
        };

        let total_fees = self.fills.iter().try_fold(Decimal::ZERO, |total, fill| {
            checked(total.checked_add(fill.fee), "total fees")
        })?;

        let holdings = if verbose {
            let summaries = self
                .holdings
                .values()
                .map(|holding| {
                    Ok(HoldingSummary {
                        ticker: holding.ticker.clone(),
                        quantity: holding.quantity,
                        average_cost: holding.average_cost,
                        current_price: holding.current_price,
                        return_pct: checked(
                            holding.return_pct(),
                            format!("return of {}", holding.ticker),
                        )?,
                    })
                })
                .collect::<Result<Vec<_>, AccountError>>()?;
            Some(summaries)
        } else {
            None
        };

        Ok(AccountReport {
            initial_funds: self.initial_funds,
            funds: self.funds,
            holdings_value,
            net_worth,
            profit,
            profit_pct,
            total_fees,
            market_return: self.market_return()?,
            holdings,
            transaction_count: self.transaction_count,
        })
    }

    /// Aggregate market return: total price change over total original price,
    /// across every ticker with a recorded original price.
    pub fn market_return(&self) -> Result<Option<Decimal>, AccountError> {
        let mut total_price = Decimal::ZERO;
        let mut total_return = Decimal::ZERO;

        for (ticker, original) in &self.original_prices {
            let latest = self
                .latest_prices
                .get(ticker)
                .ok_or_else(|| AccountError::UnknownTicker {
                    ticker: ticker.clone(),
                })?;
            total_price = checked(total_price.checked_add(*original), "market return")?;
            total_return = checked(
                latest
                    .checked_sub(*original)
                    .and_then(|change| total_return.checked_add(change)),
                "market return",
            )?;
        }

        if total_price.is_zero() {
            return Ok(None);
        }
        checked(total_return.checked_div(total_price), "market return").map(Some)
    }
}

/// Format a fraction as a percentage.
fn percent(fraction: Decimal) -> String {
    match fraction.checked_mul(dec!(100)) {
        Some(pct) => format!("{:.2}%", pct),
        None => "overflow".to_string(),
    }
}

impl fmt::Display for AccountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n{:=^50}", " ACCOUNT REPORT ")?;
        writeln!(f, "Initial Funds:    ${:.2}", self.initial_funds)?;
        writeln!(f, "Cash:             ${:.2}", self.funds)?;
        writeln!(f, "Holdings Value:   ${:.2}", self.holdings_value)?;
        writeln!(f, "Net Worth:        ${:.2}", self.net_worth)?;
        writeln!(f)?;
        writeln!(f, "Return:           ${:.2}", self.profit)?;
        writeln!(f, "Return (%):       {}", percent(self.profit_pct))?;
        writeln!(f, "Fees Paid:        ${:.2}", self.total_fees)?;
        match self.market_return {
            Some(market) => writeln!(f, "Market Return:    {}", percent(market))?,
            None => writeln!(f, "Market Return:    n/a")?,
        }

        if let Some(holdings) = &self.holdings {
            writeln!(f)?;
            writeln!(f, "--- Holdings ({}) ---", holdings.len())?;
            for h in holdings {
                writeln!(
                    f,
                    "{} - Qty: {} Purchase price: ${:.2} Avg return: {}",
                    h.ticker,
                    h.quantity,
                    h.average_cost,
                    percent(h.return_pct)
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Number of transactions: {}", self.transaction_count)?;
        writeln!(f, "{:=^50}", "")?;
        Ok(())
    }
}
