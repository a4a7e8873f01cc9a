use core_types::Asset;
use executor::ExecutorError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RebalanceError {
    #[error("Failed to read account state: {0}")]
    Executor(#[from] ExecutorError),

    #[error("No price for {0} in the portfolio snapshot")]
    MissingPrice(Asset),

    #[error("The price of {asset} ({price}) is zero or negative")]
    InvalidPrice { asset: Asset, price: Decimal },

    #[error("A calculation error occurred: {0}")]
    Calculation(String),
}
