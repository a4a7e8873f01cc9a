//! Readers for the files the rebalancer works from: target allocations, daily price
//! histories and account snapshots.

pub mod account;
pub mod error;
pub mod portfolio_visualizer;
pub mod quotes;

use core_types::{Asset, Weights};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub use account::{load_holdings, load_prices, read_holdings, read_prices};
pub use error::ParseError;
pub use portfolio_visualizer::PortfolioVisualizerParser;
pub use quotes::{load_daily_quotes, load_quote_series, read_daily_quotes};

/// Target weights together with the order in which their assets were listed.
///
/// The asset list drives the order of everything generated from these weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetPortfolio {
    pub weights: Weights,
    pub assets: Vec<Asset>,
}

/// A source format for target allocations.
pub trait PortfolioParser {
    fn parse(&self, reader: &mut dyn Read) -> Result<TargetPortfolio, ParseError>;

    fn parse_file(&self, path: &Path) -> Result<TargetPortfolio, ParseError> {
        let mut file = open(path)?;
        self.parse(&mut file)
    }
}

pub(crate) fn open(path: &Path) -> Result<File, ParseError> {
    File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}
