use crate::error::ExecutorError;
use core_types::{Asset, Order, PortfolioSnapshot, Position, Quote};
use rust_decimal::Decimal;

/// The outcome of one order in a batch passed to [`Broker::execute`].
pub type OrderOutcome = Result<(), ExecutorError>;

/// Read-only account queries.
///
/// This is everything the order generator needs to decide what to trade, so it can work
/// against the simulated ledger or any other account provider.
pub trait PortfolioQuery {
    /// Cash that is not bound in any position.
    fn available_cash(&self) -> Result<Decimal, ExecutorError>;

    /// One position per requested asset, in request order. Assets that are not held are
    /// reported with zero quantity and zero average buy price.
    fn positions(&self, assets: &[Asset]) -> Result<Vec<Position>, ExecutorError>;

    /// A fresh valuation of `assets` at the current prices.
    ///
    /// Fails with [`ExecutorError::UnknownQuote`] if any requested asset has no price.
    fn portfolio(&self, assets: &[Asset]) -> Result<PortfolioSnapshot, ExecutorError>;
}

/// A generic trait for an account that can execute orders.
///
/// The backtester talks to the in-memory `Ledger`; an adapter for a real brokerage account
/// implements the same capability set and is chosen when the application is composed.
pub trait Broker: PortfolioQuery {
    /// Applies `orders` independently and in sequence.
    ///
    /// A failed order does not stop the ones after it. The returned vector holds exactly one
    /// outcome per order, in the same order.
    fn execute(&mut self, orders: &[Order]) -> Vec<OrderOutcome>;

    /// The current quote for each requested asset, in request order.
    fn quotes(&self, assets: &[Asset]) -> Result<Vec<Quote>, ExecutorError>;
}
