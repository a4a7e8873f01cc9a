//! # Portfolio Backtester
//!
//! Replays a price history period by period against a simulated ledger and records the total
//! account value after each period. A run either holds the initial allocation (HOLD) or
//! rebalances back to the target weights every period (REBALANCE); both can be run side by
//! side for comparison.

pub mod data_handler;
pub mod driver;
pub mod error;

pub use data_handler::QuoteMatrix;
pub use driver::{BacktestDriver, Comparison};
pub use error::BacktestError;
