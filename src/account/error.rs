use rust_decimal::Decimal;

/// Reasons an account operation is rejected. A rejected operation leaves the
/// account unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds for {ticker}: need ${required:.2}, have ${available:.2}")]
    InsufficientFunds {
        ticker: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("No known price for ticker {ticker}")]
    UnknownTicker { ticker: String },

    #[error("You do not own the stock you are trying to sell: {ticker}")]
    NotOwned { ticker: String },

    #[error("Cannot sell {requested} shares of {ticker}: only {owned} owned")]
    OversellAttempt {
        ticker: String,
        requested: Decimal,
        owned: Decimal,
    },

    #[error("Trailing stop for {ordered} shares of {ticker} exceeds the {owned} owned")]
    OrderExceedsHoldings {
        ticker: String,
        ordered: Decimal,
        owned: Decimal,
    },

    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: Decimal },

    #[error("Trailing distance must not be negative, got {distance}")]
    InvalidDistance { distance: Decimal },

    #[error("Arithmetic overflow computing {context}")]
    Overflow { context: String },
}

pub(crate) fn ensure_positive(quantity: Decimal) -> Result<(), AccountError> {
    if quantity <= Decimal::ZERO {
        return Err(AccountError::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Turn the result of a checked operation into an `Overflow` error.
pub(crate) fn checked(value: Option<Decimal>, context: impl Into<String>) -> Result<Decimal, AccountError> {
    value.ok_or_else(|| AccountError::Overflow {
        context: context.into(),
    })
}
