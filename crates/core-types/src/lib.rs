pub mod enums;
pub mod error;
pub mod structs;
pub mod weights;

// Re-export the core types to provide a clean public API.
pub use enums::{CostBasisMethod, OrderSide, TradingPolicy};
pub use error::CoreError;
pub use structs::{Asset, EquityCurve, EquityPoint, Order, PortfolioSnapshot, Position, Quote};
pub use weights::{Weights, WeightsDiff};
