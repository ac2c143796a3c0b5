//! Data models for holdings, automated orders and fills.

mod holding;
mod order;
mod trade;

pub use holding::Holding;
pub use order::{TrailDistance, TrailingStopOrder, TrailingStopState};
pub use trade::{Fill, FillReason, SellQuantity, TradeSide};
