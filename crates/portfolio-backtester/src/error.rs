use core_types::Order;
use executor::ExecutorError;
use rebalance::RebalanceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Quote data error: {0}")]
    Data(String),

    #[error("Account error during backtest: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Order generation error: {0}")]
    Rebalance(#[from] RebalanceError),

    #[error("Order `{order}` was rejected in period {period}: {source}")]
    OrderRejected {
        period: usize,
        order: Box<Order>,
        source: ExecutorError,
    },

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<indicatif::style::TemplateError> for BacktestError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        BacktestError::ProgressBarTemplate(error.to_string())
    }
}
