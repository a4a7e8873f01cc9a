use crate::error::ParseError;
use crate::{PortfolioParser, TargetPortfolio, line_of};
use core_types::{Asset, Weights};
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

const HEADER_MARKER: &str = "Ticker";
const END_MARKER: &str = "Portfolio Performance";
const TICKER_COLUMN: usize = 0;
const ALLOCATION_COLUMN: usize = 2;

/// Reads the asset allocation table of a portfolio exported from PortfolioVisualizer.
///
/// The export starts with a few title rows, then a header row beginning with `Ticker`. Each
/// following row holds a ticker in the first column and an allocation such as `38.90%` in the
/// third, until the `Portfolio Performance` section starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioVisualizerParser;

impl PortfolioVisualizerParser {
    pub fn new() -> Self {
        Self
    }
}

impl PortfolioParser for PortfolioVisualizerParser {
    fn parse(&self, reader: &mut dyn Read) -> Result<TargetPortfolio, ParseError> {
        let mut rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut weights = Weights::new();
        let mut assets = Vec::new();
        let mut in_table = false;

        for record in rows.records() {
            let record = record?;
            let line = line_of(&record);
            let first = record.get(TICKER_COLUMN).unwrap_or_default().trim();

            if !in_table {
                in_table = first == HEADER_MARKER;
                continue;
            }
            if first == END_MARKER {
                break;
            }
            if first.is_empty() {
                continue;
            }

            let asset = Asset::new(first);
            if weights.contains(&asset) {
                return Err(ParseError::InvalidRecord {
                    line,
                    reason: format!("{} is listed twice", asset),
                });
            }
            let raw = record.get(ALLOCATION_COLUMN).ok_or_else(|| ParseError::InvalidRecord {
                line,
                reason: format!("no allocation column for {}", asset),
            })?;
            let weight = parse_percentage(raw).ok_or_else(|| ParseError::InvalidAllocation {
                line,
                value: raw.to_string(),
            })?;

            tracing::debug!(%asset, %weight, "Parsed allocation");
            weights.insert(asset.clone(), weight);
            assets.push(asset);
        }

        if !in_table {
            return Err(ParseError::MissingSection(format!(
                "no '{}' header row",
                HEADER_MARKER
            )));
        }
        Ok(TargetPortfolio { weights, assets })
    }
}

/// `" 38.90% "` -> `0.389`.
fn parse_percentage(raw: &str) -> Option<Decimal> {
    let number = raw.trim().replace('%', "");
    let percent = Decimal::from_str(number.trim()).ok()?;
    percent.checked_div(Decimal::ONE_HUNDRED)
}
