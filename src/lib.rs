//! Simulated trading account.
//!
//! An [`Account`] holds cash and shares, takes one price snapshot per
//! simulated time step, executes manual buys and sells, runs trailing-stop
//! orders against incoming prices and reports performance. Every rejected
//! operation comes back as an [`AccountError`] and leaves the account as it
//! was.

pub mod account;
pub mod models;
pub mod scenario;

pub use account::{Account, AccountConfig, AccountError, AccountReport, PriceSnapshot};
pub use models::{Fill, FillReason, Holding, SellQuantity, TradeSide, TrailDistance, TrailingStopOrder};
pub use scenario::{Action, ReplaySummary, Scenario};
