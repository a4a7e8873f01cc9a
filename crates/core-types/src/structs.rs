use crate::enums::OrderSide;
use crate::error::CoreError;
use crate::weights::Weights;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A tradable instrument, identified by its ticker symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset {
    pub symbol: String,
}

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// An asset without a symbol. Orders referencing it are rejected by the ledger.
    pub fn is_empty(&self) -> bool {
        self.symbol.is_empty()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Asset {
    type Err = CoreError;

    /// Parses a ticker, trimming surrounding whitespace. Empty tickers are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        if symbol.is_empty() {
            return Err(CoreError::InvalidInput(
                "asset".to_string(),
                "ticker symbol is empty".to_string(),
            ));
        }
        Ok(Self::new(symbol))
    }
}

/// A single point-in-time price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub asset: Asset,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn new(asset: Asset, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            asset,
            price,
            timestamp,
        }
    }
}

/// The quantity and weighted-average cost basis held for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub asset: Asset,
    pub quantity: Decimal,
    pub avg_buy_price: Decimal,
}

impl Position {
    pub fn new(asset: Asset, quantity: Decimal, avg_buy_price: Decimal) -> Self {
        Self {
            asset,
            quantity,
            avg_buy_price,
        }
    }

    /// The zero position reported for assets that are not held.
    pub fn empty(asset: Asset) -> Self {
        Self::new(asset, Decimal::ZERO, Decimal::ZERO)
    }

    /// Relative return of selling at `price`, measured against the average buy price.
    ///
    /// Returns `None` when the average buy price is not positive (e.g. shares received for free),
    /// since no meaningful return can be computed.
    pub fn return_at(&self, price: Decimal) -> Option<Decimal> {
        if self.avg_buy_price <= Decimal::ZERO {
            return None;
        }
        (price - self.avg_buy_price).checked_div(self.avg_buy_price)
    }
}

/// An immutable buy or sell instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub description: String,
    pub side: OrderSide,
    pub asset: Asset,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Order {
    pub fn new(
        description: impl Into<String>,
        side: OrderSide,
        asset: Asset,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            side,
            asset,
            price,
            quantity,
        }
    }

    pub fn buy(asset: Asset, price: Decimal, quantity: Decimal) -> Self {
        Self::new("", OrderSide::Buy, asset, price, quantity)
    }

    pub fn sell(asset: Asset, price: Decimal, quantity: Decimal) -> Self {
        Self::new("", OrderSide::Sell, asset, price, quantity)
    }

    /// Cash value of the order (`price * quantity`).
    pub fn value(&self) -> Decimal {
        self.price * self.quantity
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x {} @ {}",
            self.side, self.quantity, self.asset, self.price
        )?;
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

/// A read-only valuation of a set of holdings at the current prices.
///
/// Snapshots are computed fresh on every query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioSnapshot {
    pub weights: Weights,
    pub quantities: HashMap<Asset, Decimal>,
    pub prices: HashMap<Asset, Decimal>,
    pub total_value: Decimal,
    pub assets: Vec<Asset>,
}

impl PortfolioSnapshot {
    pub fn price(&self, asset: &Asset) -> Option<Decimal> {
        self.prices.get(asset).copied()
    }

    pub fn quantity(&self, asset: &Asset) -> Decimal {
        self.quantities.get(asset).copied().unwrap_or_default()
    }
}

/// Total account value (cash plus holdings) at the end of one backtest period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub period: usize,
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

/// The per-period sequence of total portfolio values produced by a backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn with_capacity(periods: usize) -> Self {
        Self {
            points: Vec::with_capacity(periods),
        }
    }

    pub fn push(&mut self, point: EquityPoint) {
        self.points.push(point);
    }

    pub fn values(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }
}
