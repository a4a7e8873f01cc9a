//! # Executor Crate
//!
//! This crate provides trade execution and account state management. It defines the
//! `Broker` capability set and the `Ledger`, the in-memory simulated account used for
//! backtesting.
//!
//! ## Architectural Principles
//!
//! - **State vs. Logic Decoupling:** The cost-basis update is a pure function
//!   (`cost_basis::apply_fill`) from the held position and an order to the new position. The
//!   `Ledger` validates orders and applies the results of that function to its cash and
//!   positions.
//! - **Execution Abstraction:** Higher-level components such as the order generator and the
//!   backtest driver only see the `PortfolioQuery` and `Broker` traits, so they are agnostic
//!   about whether they talk to a simulation or a real account.
//! - **Per-Order Fault Isolation:** `Broker::execute` applies a batch order by order and
//!   reports one outcome per order; a rejected order never blocks the rest of the batch.
//!
//! ## Public API
//!
//! - `PortfolioQuery` / `Broker`: The account capability traits.
//! - `Ledger`: The simulated account.
//! - `ExecutorError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod broker;
pub mod cost_basis;
pub mod error;
pub mod ledger;

// Re-export the key components to provide a clean, public-facing API.
pub use broker::{Broker, OrderOutcome, PortfolioQuery};
pub use cost_basis::apply_fill;
pub use error::ExecutorError;
pub use ledger::Ledger;
