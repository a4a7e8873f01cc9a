//! Turns a set of target weights into the orders that move an account towards them.
//!
//! The generator only reads account state through [`executor::PortfolioQuery`] and never
//! executes anything. Executing the returned orders is left to the caller.

pub mod error;
pub mod generator;

pub use error::RebalanceError;
pub use generator::{
    ALLOCATION_DESCRIPTION, OrderGenerator, PURCHASE_DESCRIPTION, RebalanceOptions, ResidualCash,
    SALE_DESCRIPTION,
};
