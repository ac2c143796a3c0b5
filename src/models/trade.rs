//! Trade records: side, sell quantity and executed fills.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

/// Why a fill happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillReason {
    /// Placed directly by the caller
    Manual,
    /// Executed by a triggered trailing stop
    TrailingStop,
    /// Part of a sell-everything liquidation
    Liquidation,
}

/// Shares to sell: an explicit amount or the whole holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellQuantity {
    All,
    Shares(Decimal),
}

impl From<Decimal> for SellQuantity {
    fn from(shares: Decimal) -> Self {
        SellQuantity::Shares(shares)
    }
}

impl FromStr for SellQuantity {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            Ok(SellQuantity::All)
        } else {
            Decimal::from_str(s).map(SellQuantity::Shares)
        }
    }
}

impl fmt::Display for SellQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellQuantity::All => f.write_str("all"),
            SellQuantity::Shares(shares) => write!(f, "{}", shares),
        }
    }
}

impl Serialize for SellQuantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SellQuantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SellQuantityVisitor;

        impl<'de> Visitor<'de> for SellQuantityVisitor {
            type Value = SellQuantity;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a share count or \"all\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                SellQuantity::from_str(v).map_err(de::Error::custom)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(SellQuantity::Shares(Decimal::from(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(SellQuantity::Shares(Decimal::from(v)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Decimal::try_from(v)
                    .map(SellQuantity::Shares)
                    .map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(SellQuantityVisitor)
    }
}

/// An executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub ticker: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    /// Execution price per share
    pub price: Decimal,
    /// Flat transaction fee charged
    pub fee: Decimal,
    pub reason: FillReason,
    pub executed_at: DateTime<Utc>,
}

impl Fill {
    /// Share value before fees, `None` on overflow.
    pub fn gross(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }

    /// Change in cash caused by this fill, fee included. `None` on overflow.
    pub fn cash_flow(&self) -> Option<Decimal> {
        let gross = self.gross()?;
        match self.side {
            TradeSide::Buy => gross.checked_add(self.fee).map(|cost| -cost),
            TradeSide::Sell => gross.checked_sub(self.fee),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_fill(side: TradeSide) -> Fill {
        Fill {
            ticker: "AAPL".to_string(),
            side,
            quantity: dec!(5),
            price: dec!(150),
            fee: dec!(6.99),
            reason: FillReason::Manual,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn test_fill_cash_flow() {
        assert_eq!(make_fill(TradeSide::Buy).cash_flow(), Some(dec!(-756.99)));
        assert_eq!(make_fill(TradeSide::Sell).cash_flow(), Some(dec!(743.01)));
        assert_eq!(make_fill(TradeSide::Sell).gross(), Some(dec!(750)));
        assert_eq!(TradeSide::Sell.as_str(), "SELL");
    }

    #[test]
    fn test_sell_quantity_parsing() {
        assert_eq!("all".parse::<SellQuantity>().unwrap(), SellQuantity::All);
        assert_eq!(" ALL ".parse::<SellQuantity>().unwrap(), SellQuantity::All);
        assert_eq!(
            "12.5".parse::<SellQuantity>().unwrap(),
            SellQuantity::Shares(dec!(12.5))
        );
        assert!("some".parse::<SellQuantity>().is_err());
    }

    #[test]
    fn test_sell_quantity_from_json() {
        let all: SellQuantity = serde_json::from_str("\"all\"").unwrap();
        let count: SellQuantity = serde_json::from_str("7").unwrap();
        let text: SellQuantity = serde_json::from_str("\"3.5\"").unwrap();

        assert_eq!(all, SellQuantity::All);
        assert_eq!(count, SellQuantity::Shares(dec!(7)));
        assert_eq!(text, SellQuantity::Shares(dec!(3.5)));
        assert_eq!(serde_json::to_string(&SellQuantity::All).unwrap(), "\"all\"");
    }
}
