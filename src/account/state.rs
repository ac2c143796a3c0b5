//! Account state: cash, holdings, prices and manual trading.
//!
//! The account is driven by an external caller that feeds one price snapshot
//! per simulated time step through [`Account::update`]. Automated orders are
//! only ever evaluated inside that call.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::error::{checked, ensure_positive};
use super::{AccountConfig, AccountError};
use crate::models::{Fill, FillReason, Holding, SellQuantity, TradeSide};

/// Latest price per ticker, supplied whole on every update.
pub type PriceSnapshot = HashMap<String, Decimal>;

/// A single simulated trading account.
#[derive(Debug, Clone)]
pub struct Account {
    pub(super) funds: Decimal,
    pub(super) initial_funds: Decimal,
    pub(super) transaction_fee: Decimal,
    pub(super) transaction_count: u64,
    pub(super) record_all_original_prices: bool,
    pub(super) latest_prices: PriceSnapshot,
    /// First price ever observed, written once per ticker
    pub(super) original_prices: BTreeMap<String, Decimal>,
    pub(super) holdings: BTreeMap<String, Holding>,
    pub(super) fills: Vec<Fill>,
}

impl Default for Account {
    fn default() -> Self {
        Self::with_config(AccountConfig::default())
    }
}

impl Account {
    /// Create an account with starting funds and a flat per-trade fee.
    pub fn new(funds: Decimal, transaction_fee: Decimal) -> Self {
        Self::with_config(AccountConfig::new(funds, transaction_fee))
    }

    pub fn with_config(config: AccountConfig) -> Self {
        Self {
            funds: config.initial_funds,
            initial_funds: config.initial_funds,
            transaction_fee: config.transaction_fee,
            transaction_count: 0,
            record_all_original_prices: config.record_all_original_prices,
            latest_prices: HashMap::new(),
            original_prices: BTreeMap::new(),
            holdings: BTreeMap::new(),
            fills: Vec::new(),
        }
    }

    pub fn funds(&self) -> Decimal {
        self.funds
    }

    pub fn initial_funds(&self) -> Decimal {
        self.initial_funds
    }

    pub fn transaction_fee(&self) -> Decimal {
        self.transaction_fee
    }

    pub fn transaction_count(&self) -> u64 {
        self.transaction_count
    }

    pub fn latest_prices(&self) -> &PriceSnapshot {
        &self.latest_prices
    }

    pub fn original_prices(&self) -> &BTreeMap<String, Decimal> {
        &self.original_prices
    }

    pub fn holdings(&self) -> &BTreeMap<String, Holding> {
        &self.holdings
    }

    pub fn holding(&self, ticker: &str) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    /// Every executed trade, oldest first.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    // ==================== Price Updates ====================

    /// Replace the price table with `prices` and re-evaluate every holding.
    ///
    /// Only `ticker` is snapshotted into the original prices unless the
    /// account was configured to record every newly seen ticker. Returns the
    /// fills executed by trailing stops during this tick.
    pub fn update(&mut self, prices: PriceSnapshot, ticker: &str) -> Result<Vec<Fill>, AccountError> {
        let trigger_price = *prices.get(ticker).ok_or_else(|| AccountError::UnknownTicker {
            ticker: ticker.to_string(),
        })?;

        if self.record_all_original_prices {
            for (symbol, price) in &prices {
                self.original_prices.entry(symbol.clone()).or_insert(*price);
            }
        } else {
            self.original_prices
                .entry(ticker.to_string())
                .or_insert(trigger_price);
        }

        self.latest_prices = prices;

        let priced: Vec<(String, Decimal)> = self
            .holdings
            .keys()
            .filter_map(|symbol| {
                self.latest_prices
                    .get(symbol)
                    .map(|price| (symbol.clone(), *price))
            })
            .collect();

        let mut triggered = Vec::new();
        for (symbol, price) in priced {
            if let Some(holding) = self.holdings.get_mut(&symbol) {
                holding.update_price(price);
            }
            if let Some(fill) = self.evaluate_trailing_stop(&symbol) {
                triggered.push(fill);
            }
        }

        debug!(
            ticker = %ticker,
            tickers = self.latest_prices.len(),
            triggered = triggered.len(),
            "Prices updated"
        );

        Ok(triggered)
    }

    // ==================== Manual Trading ====================

    /// Buy shares at the latest known price.
    pub fn buy(&mut self, ticker: &str, quantity: Decimal) -> Result<Fill, AccountError> {
        ensure_positive(quantity)?;

        let price = *self
            .latest_prices
            .get(ticker)
            .ok_or_else(|| AccountError::UnknownTicker {
                ticker: ticker.to_string(),
            })?;

        // A cost too large to represent can never be afforded
        let cost = quantity
            .checked_mul(price)
            .and_then(|gross| gross.checked_add(self.transaction_fee));
        let cost = match cost {
            Some(cost) if cost <= self.funds => cost,
            _ => {
                return Err(AccountError::InsufficientFunds {
                    ticker: ticker.to_string(),
                    required: cost.unwrap_or(Decimal::MAX),
                    available: self.funds,
                });
            }
        };

        match self.holdings.entry(ticker.to_string()) {
            Entry::Occupied(mut entry) => {
                checked(
                    entry.get_mut().add(quantity, price),
                    format!("average cost of {}", ticker),
                )?;
            }
            Entry::Vacant(entry) => {
                entry.insert(Holding::new(ticker, quantity, price));
            }
        }

        self.funds -= cost;
        self.transaction_count += 1;

        info!(
            ticker = %ticker,
            quantity = %quantity,
            price = %price,
            funds = %self.funds,
            "Bought shares"
        );

        Ok(self.record_fill(ticker, TradeSide::Buy, quantity, price, FillReason::Manual))
    }

    /// Sell shares at the holding's current price. Accepts a share count or
    /// [`SellQuantity::All`].
    pub fn sell(
        &mut self,
        ticker: &str,
        quantity: impl Into<SellQuantity>,
    ) -> Result<Fill, AccountError> {
        let holding = self
            .holdings
            .get(ticker)
            .ok_or_else(|| AccountError::NotOwned {
                ticker: ticker.to_string(),
            })?;

        let quantity = match quantity.into() {
            SellQuantity::All => holding.quantity,
            SellQuantity::Shares(shares) => {
                ensure_positive(shares)?;
                shares
            }
        };

        if quantity > holding.quantity {
            return Err(AccountError::OversellAttempt {
                ticker: ticker.to_string(),
                requested: quantity,
                owned: holding.quantity,
            });
        }

        let price = holding.current_price;
        self.settle_sell(ticker, quantity, price, FillReason::Manual)
    }

    /// Sell every holding at its current price, discarding attached orders.
    ///
    /// Funds are not checked: the fee is taken from the proceeds even when
    /// that pushes funds negative. Only an unrepresentable total fails, and
    /// then nothing is sold.
    pub fn sell_all(&mut self) -> Result<Vec<Fill>, AccountError> {
        let mut funds = self.funds;
        for holding in self.holdings.values() {
            let proceeds = holding
                .market_value()
                .and_then(|value| value.checked_sub(self.transaction_fee))
                .and_then(|proceeds| funds.checked_add(proceeds));
            funds = checked(proceeds, format!("liquidation of {}", holding.ticker))?;
        }

        let holdings = std::mem::take(&mut self.holdings);
        self.funds = funds;

        let fills = holdings
            .into_values()
            .map(|holding| {
                self.transaction_count += 1;
                self.record_fill(
                    &holding.ticker,
                    TradeSide::Sell,
                    holding.quantity,
                    holding.current_price,
                    FillReason::Liquidation,
                )
            })
            .collect();

        Ok(fills)
    }

    // ==================== Valuation ====================

    /// Market value of all holdings.
    pub fn value(&self) -> Result<Decimal, AccountError> {
        self.holdings.values().try_fold(Decimal::ZERO, |total, holding| {
            checked(
                holding
                    .market_value()
                    .and_then(|value| total.checked_add(value)),
                format!("value of {}", holding.ticker),
            )
        })
    }

    /// Cash plus market value of holdings.
    pub fn net_worth(&self) -> Result<Decimal, AccountError> {
        checked(self.funds.checked_add(self.value()?), "net worth")
    }

    // ==================== Settlement ====================

    /// Execute a sell whose quantity is already validated against the holding.
    /// Fails without side effects if the proceeds overflow.
    pub(super) fn settle_sell(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
        reason: FillReason,
    ) -> Result<Fill, AccountError> {
        let funds = quantity
            .checked_mul(price)
            .and_then(|gross| gross.checked_sub(self.transaction_fee))
            .and_then(|proceeds| self.funds.checked_add(proceeds));
        self.funds = checked(funds, format!("sale of {}", ticker))?;
        self.transaction_count += 1;

        let closed = match self.holdings.get_mut(ticker) {
            Some(holding) => {
                holding.reduce(quantity);
                holding.is_closed()
            }
            None => false,
        };
        if closed {
            self.holdings.remove(ticker);
        }

        info!(
            ticker = %ticker,
            quantity = %quantity,
            price = %price,
            reason = ?reason,
            funds = %self.funds,
            "Sold shares"
        );

        Ok(self.record_fill(ticker, TradeSide::Sell, quantity, price, reason))
    }

    fn record_fill(
        &mut self,
        ticker: &str,
        side: TradeSide,
        quantity: Decimal,
        price: Decimal,
        reason: FillReason,
    ) -> Fill {
        let fill = Fill {
            ticker: ticker.to_string(),
            side,
            quantity,
            price,
            fee: self.transaction_fee,
            reason,
            executed_at: Utc::now(),
        };
        debug!(
            ticker = %fill.ticker,
            side = fill.side.as_str(),
            gross = ?fill.gross(),
            cash_flow = ?fill.cash_flow(),
            "Fill recorded"
        );
        self.fills.push(fill.clone());
        fill
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Funds in account: {:.2}", self.funds)?;
        write!(f, "Stocks owned:")?;
        if self.holdings.is_empty() {
            return write!(f, " none");
        }
        for holding in self.holdings.values() {
            write!(
                f,
                "\n  {} x{} @ {:.2} (cost {:.2})",
                holding.ticker, holding.quantity, holding.current_price, holding.average_cost
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prices(entries: &[(&str, Decimal)]) -> PriceSnapshot {
        entries
            .iter()
            .map(|(ticker, price)| (ticker.to_string(), *price))
            .collect()
    }

    fn funded_account() -> Account {
        let mut account = Account::new(dec!(10000), dec!(6.99));
        account
            .update(prices(&[("AAPL", dec!(150)), ("MSFT", dec!(300))]), "AAPL")
            .unwrap();
        account
    }

    #[test]
    fn test_buy_then_sell_costs_two_fees() {
        let mut account = funded_account();

        account.buy("AAPL", dec!(10)).unwrap();
        assert_eq!(account.funds(), dec!(10000) - dec!(1500) - dec!(6.99));

        account.sell("AAPL", dec!(10)).unwrap();
        assert_eq!(account.funds(), dec!(10000) - dec!(2) * dec!(6.99));
        assert!(account.holdings().is_empty());
        assert_eq!(account.transaction_count(), 2);
        assert_eq!(account.fills().len(), 2);
    }

    #[test]
    fn test_buy_merges_average_cost() {
        let mut account = funded_account();

        account.buy("AAPL", dec!(10)).unwrap();
        account
            .update(prices(&[("AAPL", dec!(160)), ("MSFT", dec!(300))]), "AAPL")
            .unwrap();
        account.buy("AAPL", dec!(30)).unwrap();

        let holding = account.holding("AAPL").unwrap();
        assert_eq!(holding.quantity, dec!(40));
        // (1500 + 4800) / 40 = 157.5
        assert_eq!(holding.average_cost, dec!(157.5));
        assert_eq!(holding.current_price, dec!(160));
    }

    #[test]
    fn test_buy_insufficient_funds_leaves_state() {
        let mut account = funded_account();

        let err = account.buy("MSFT", dec!(34)).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert_eq!(account.funds(), dec!(10000));
        assert_eq!(account.transaction_count(), 0);
        assert!(account.holdings().is_empty());
    }

    #[test]
    fn test_buy_fee_must_also_be_covered() {
        let mut account = Account::new(dec!(1500), dec!(6.99));
        account.update(prices(&[("AAPL", dec!(150))]), "AAPL").unwrap();

        assert!(account.buy("AAPL", dec!(10)).is_err());
        assert!(account.buy("AAPL", dec!(9)).is_ok());
    }

    #[test]
    fn test_buy_unknown_ticker() {
        let mut account = funded_account();

        let err = account.buy("TSLA", dec!(1)).unwrap_err();
        assert_eq!(
            err,
            AccountError::UnknownTicker {
                ticker: "TSLA".to_string()
            }
        );
    }

    #[test]
    fn test_non_positive_quantities_rejected() {
        let mut account = funded_account();

        assert!(matches!(
            account.buy("AAPL", Decimal::ZERO),
            Err(AccountError::InvalidQuantity { .. })
        ));
        account.buy("AAPL", dec!(1)).unwrap();
        assert!(matches!(
            account.sell("AAPL", dec!(-1)),
            Err(AccountError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_sell_errors() {
        let mut account = funded_account();

        assert!(matches!(
            account.sell("AAPL", dec!(1)),
            Err(AccountError::NotOwned { .. })
        ));

        account.buy("AAPL", dec!(5)).unwrap();
        let err = account.sell("AAPL", dec!(6)).unwrap_err();
        assert_eq!(
            err,
            AccountError::OversellAttempt {
                ticker: "AAPL".to_string(),
                requested: dec!(6),
                owned: dec!(5),
            }
        );
        assert_eq!(account.holding("AAPL").unwrap().quantity, dec!(5));
    }

    #[test]
    fn test_sell_all_sentinel() {
        let mut account = funded_account();
        account.buy("AAPL", dec!(5)).unwrap();

        let fill = account.sell("AAPL", SellQuantity::All).unwrap();

        assert_eq!(fill.quantity, dec!(5));
        assert_eq!(fill.side, TradeSide::Sell);
        assert!(account.holding("AAPL").is_none());
    }

    #[test]
    fn test_partial_sell_keeps_average_cost() {
        let mut account = funded_account();
        account.buy("AAPL", dec!(10)).unwrap();
        account
            .update(prices(&[("AAPL", dec!(170))]), "AAPL")
            .unwrap();

        account.sell("AAPL", dec!(4)).unwrap();

        let holding = account.holding("AAPL").unwrap();
        assert_eq!(holding.quantity, dec!(6));
        assert_eq!(holding.average_cost, dec!(150));
    }

    #[test]
    fn test_sell_all_liquidates() {
        let mut account = funded_account();
        account.buy("AAPL", dec!(5)).unwrap();
        let before = account.funds();

        let fills = account.sell_all().unwrap();

        assert_eq!(fills.len(), 1);
        assert_eq!(account.funds() - before, dec!(5) * dec!(150) - dec!(6.99));
        assert!(account.holdings().is_empty());
        assert_eq!(account.transaction_count(), 2);
    }

    #[test]
    fn test_sell_all_may_overdraw() {
        let mut account = Account::new(dec!(10), dec!(6.99));
        account.update(prices(&[("PENNY", dec!(0.01))]), "PENNY").unwrap();
        account.buy("PENNY", dec!(1)).unwrap();

        account.sell_all().unwrap();

        assert!(account.funds() < Decimal::ZERO);
    }

    #[test]
    fn test_update_records_only_trigger_ticker() {
        let mut account = funded_account();

        assert_eq!(account.original_prices().len(), 1);
        assert_eq!(account.original_prices().get("AAPL"), Some(&dec!(150)));

        account
            .update(prices(&[("AAPL", dec!(155)), ("MSFT", dec!(310))]), "MSFT")
            .unwrap();
        assert_eq!(account.original_prices().get("AAPL"), Some(&dec!(150)));
        assert_eq!(account.original_prices().get("MSFT"), Some(&dec!(310)));
    }

    #[test]
    fn test_update_can_record_every_ticker() {
        let config = AccountConfig::new(dec!(1000), dec!(1)).with_all_original_prices(true);
        let mut account = Account::with_config(config);

        account
            .update(prices(&[("AAPL", dec!(150)), ("MSFT", dec!(300))]), "AAPL")
            .unwrap();
        account
            .update(prices(&[("AAPL", dec!(151)), ("MSFT", dec!(301))]), "AAPL")
            .unwrap();

        assert_eq!(account.original_prices().get("AAPL"), Some(&dec!(150)));
        assert_eq!(account.original_prices().get("MSFT"), Some(&dec!(300)));
    }

    #[test]
    fn test_update_rejects_missing_trigger_ticker() {
        let mut account = funded_account();

        let err = account
            .update(prices(&[("MSFT", dec!(1))]), "AAPL")
            .unwrap_err();

        assert!(matches!(err, AccountError::UnknownTicker { .. }));
        assert_eq!(account.latest_prices().get("AAPL"), Some(&dec!(150)));
    }

    #[test]
    fn test_update_replaces_prices_and_skips_unpriced_holdings() {
        let mut account = funded_account();
        account.buy("MSFT", dec!(2)).unwrap();

        account.update(prices(&[("AAPL", dec!(140))]), "AAPL").unwrap();

        assert!(!account.latest_prices().contains_key("MSFT"));
        assert_eq!(account.holding("MSFT").unwrap().current_price, dec!(300));
        assert_eq!(account.value(), Ok(dec!(600)));
    }

    #[test]
    fn test_unaffordable_overflowing_buy_is_rejected() {
        let mut account = Account::new(dec!(100000), dec!(6.99));
        account
            .update(prices(&[("AAPL", dec!(1000000000))]), "AAPL")
            .unwrap();
        let quantity = Decimal::from_i128_with_scale(10i128.pow(20), 0);

        let err = account.buy("AAPL", quantity).unwrap_err();

        assert_eq!(
            err,
            AccountError::InsufficientFunds {
                ticker: "AAPL".to_string(),
                required: Decimal::MAX,
                available: dec!(100000),
            }
        );
        assert_eq!(account.funds(), dec!(100000));
        assert!(account.holdings().is_empty());
    }

    #[test]
    fn test_overflowing_valuation_is_an_error() {
        let mut account = Account::new(dec!(10000000000000000), dec!(1));
        account.update(prices(&[("BIG", dec!(1))]), "BIG").unwrap();
        account.buy("BIG", dec!(1000000000000000)).unwrap();
        account
            .update(prices(&[("BIG", dec!(100000000000000))]), "BIG")
            .unwrap();
        let funds = account.funds();

        assert!(matches!(account.value(), Err(AccountError::Overflow { .. })));
        assert!(matches!(account.net_worth(), Err(AccountError::Overflow { .. })));
        assert!(matches!(
            account.sell("BIG", SellQuantity::All),
            Err(AccountError::Overflow { .. })
        ));
        assert!(matches!(account.sell_all(), Err(AccountError::Overflow { .. })));

        assert_eq!(account.funds(), funds);
        assert_eq!(account.transaction_count(), 1);
        assert_eq!(
            account.holding("BIG").unwrap().quantity,
            dec!(1000000000000000)
        );
    }

    #[test]
    fn test_display() {
        let mut account = funded_account();
        account.buy("AAPL", dec!(2)).unwrap();

        let text = account.to_string();
        assert!(text.starts_with("Funds in account: 9693.01"));
        assert!(text.contains("AAPL x2"));
    }
}
