use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether a backtest re-trades every period or only establishes the initial allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingPolicy {
    Hold,
    Rebalance,
}

impl fmt::Display for TradingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingPolicy::Hold => write!(f, "HOLD"),
            TradingPolicy::Rebalance => write!(f, "REBALANCE"),
        }
    }
}

/// How a sell updates the average buy price of the position that remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasisMethod {
    /// The sale proceeds are taken out of the remaining cost basis:
    /// `(avg * held - price * sold) / (held - sold)`.
    #[default]
    NetProceeds,
    /// The remaining shares keep their average buy price.
    AverageCost,
}
