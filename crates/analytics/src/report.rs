use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A standardized summary of one backtest run.
///
/// This struct is the final output of the `AnalyticsEngine` and is what gets printed and
/// written to `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Period
    pub periods: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    // II. Profitability
    pub starting_value: Decimal,
    pub final_value: Decimal,
    pub total_net_profit: Decimal,
    pub total_return_pct: Decimal,

    // III. Risk and Drawdown
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub sharpe_ratio: Option<Decimal>, // None with fewer than two returns or no variance
    pub calmar_ratio: Option<Decimal>, // None without a drawdown
}
