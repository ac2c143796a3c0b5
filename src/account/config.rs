//! Account configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for a simulated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Starting cash balance
    pub initial_funds: Decimal,

    /// Flat fee charged on every executed trade
    pub transaction_fee: Decimal,

    /// Record the first price of every ticker in each snapshot, not only the
    /// ticker that triggered the update
    #[serde(default)]
    pub record_all_original_prices: bool,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_funds: dec!(100000),
            transaction_fee: dec!(6.99),
            record_all_original_prices: false,
        }
    }
}

impl AccountConfig {
    pub fn new(initial_funds: Decimal, transaction_fee: Decimal) -> Self {
        Self {
            initial_funds,
            transaction_fee,
            ..Self::default()
        }
    }

    pub fn with_all_original_prices(mut self, enabled: bool) -> Self {
        self.record_all_original_prices = enabled;
        self
    }
}
