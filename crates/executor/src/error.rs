use core_types::Asset;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Not enough cash to buy {asset}. Required: {required}, Available: {available}")]
    InsufficientCash {
        asset: Asset,
        required: Decimal,
        available: Decimal,
    },

    #[error("Not enough {asset} held to sell. Requested: {requested}, Held: {held}")]
    InsufficientPosition {
        asset: Asset,
        requested: Decimal,
        held: Decimal,
    },

    #[error("Cannot sell {0}: no open position")]
    NoPosition(Asset),

    #[error("No current quote for {0}")]
    UnknownQuote(Asset),
}
