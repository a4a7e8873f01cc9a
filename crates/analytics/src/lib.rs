//! # Analytics Engine
//!
//! Performance metrics for the equity curves produced by the portfolio backtester.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: a stateless calculator. It takes an equity curve and produces a
//!   `PerformanceReport`, or the normalized cumulative-return series used for charting.
//! - `PerformanceReport`: the serializable summary of one run.
//! - `AnalyticsError`: the errors that can be returned from this crate.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
