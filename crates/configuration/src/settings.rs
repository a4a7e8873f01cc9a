use core_types::CostBasisMethod;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: Account,
    pub backtest: Backtest,
    pub rebalance: Rebalance,
    pub logging: Logging,
}

/// Settings of the simulated ledger, shared by backtests and the `rebalance` command.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Account {
    /// How sells update the average buy price of the remaining shares.
    pub cost_basis: CostBasisMethod,
}

/// Contains parameters for a backtest run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Backtest {
    /// The cash the simulated ledger starts with.
    pub starting_cash: Decimal,
    /// Draw a progress bar per simulated run.
    pub show_progress: bool,
}

impl Default for Backtest {
    fn default() -> Self {
        Self {
            starting_cash: dec!(10000),
            show_progress: true,
        }
    }
}

/// Contains the policy toggles of the order generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Rebalance {
    /// Emit fractional quantities instead of flooring to whole shares.
    pub allow_partial_shares: bool,
    /// Suppress sells whose return against the average buy price is below this fraction.
    /// Absent or non-positive disables the gate.
    pub min_return: Option<Decimal>,
    /// Spend cash left over after the rebalance pass according to the target weights.
    pub allocate_residual_cash: bool,
}

impl Default for Rebalance {
    fn default() -> Self {
        Self {
            allow_partial_shares: false,
            min_return: None,
            allocate_residual_cash: true,
        }
    }
}

impl Rebalance {
    /// The minimum-return threshold, if the gate is active.
    pub fn active_min_return(&self) -> Option<Decimal> {
        self.min_return.filter(|threshold| *threshold > Decimal::ZERO)
    }
}

/// Contains log output settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
    /// Write a daily rolling log file into this directory in addition to stderr.
    pub directory: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
