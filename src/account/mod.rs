//! Simulated trading account: prices, manual trades, trailing stops, reporting.

mod config;
mod error;
mod report;
mod state;
mod trailing;

pub use config::AccountConfig;
pub use error::AccountError;
pub use report::{AccountReport, HoldingSummary};
pub use state::{Account, PriceSnapshot};
