use crate::error::ParseError;
use crate::{line_of, open};
use chrono::{DateTime, Utc};
use core_types::{Asset, CoreError, Position, Quote};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PriceRecord {
    symbol: String,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct HoldingRecord {
    symbol: String,
    quantity: Decimal,
    avg_buy_price: Decimal,
}

/// Reads a `symbol,price` snapshot. Every quote is stamped with `as_of`.
pub fn read_prices(reader: impl Read, as_of: DateTime<Utc>) -> Result<Vec<Quote>, ParseError> {
    read_records(reader, |line, asset, record: PriceRecord| {
        if record.price <= Decimal::ZERO {
            return Err(ParseError::InvalidRecord {
                line,
                reason: format!("price of {} must be positive", asset),
            });
        }
        Ok(Quote::new(asset, record.price, as_of))
    })
}

/// Reads a `symbol,quantity,avg_buy_price` holdings file.
pub fn read_holdings(reader: impl Read) -> Result<Vec<Position>, ParseError> {
    read_records(reader, |line, asset, record: HoldingRecord| {
        if record.quantity < Decimal::ZERO || record.avg_buy_price < Decimal::ZERO {
            return Err(ParseError::InvalidRecord {
                line,
                reason: format!("negative quantity or price for {}", asset),
            });
        }
        Ok(Position::new(asset, record.quantity, record.avg_buy_price))
    })
}

pub fn load_prices(path: &Path, as_of: DateTime<Utc>) -> Result<Vec<Quote>, ParseError> {
    read_prices(open(path)?, as_of)
}

pub fn load_holdings(path: &Path) -> Result<Vec<Position>, ParseError> {
    read_holdings(open(path)?)
}

/// Deserializes every row, rejecting empty or repeated symbols before handing the row and
/// its asset to `convert`.
fn read_records<R, T, F>(reader: impl Read, mut convert: F) -> Result<Vec<T>, ParseError>
where
    R: for<'de> Deserialize<'de> + HasSymbol,
    F: FnMut(u64, Asset, R) -> Result<T, ParseError>,
{
    let mut rows = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rows.headers()?.clone();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for record in rows.records() {
        let record = record?;
        let line = line_of(&record);
        let row: R = record.deserialize(Some(&headers))?;
        let asset: Asset = row
            .symbol()
            .parse()
            .map_err(|e: CoreError| ParseError::InvalidRecord {
                line,
                reason: e.to_string(),
            })?;
        if !seen.insert(asset.clone()) {
            return Err(ParseError::InvalidRecord {
                line,
                reason: format!("{} is listed twice", asset),
            });
        }
        out.push(convert(line, asset, row)?);
    }
    Ok(out)
}

trait HasSymbol {
    fn symbol(&self) -> &str;
}

impl HasSymbol for PriceRecord {
    fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl HasSymbol for HoldingRecord {
    fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn prices_are_stamped() {
        let as_of = Utc::now();
        let quotes = read_prices("symbol,price\nAAPL, 157.92\nSAP,99.30\n".as_bytes(), as_of).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].asset, Asset::new("AAPL"));
        assert_eq!(quotes[0].price, dec!(157.92));
        assert!(quotes.iter().all(|q| q.timestamp == as_of));
    }

    #[test]
    fn holdings_keep_cost_basis() {
        let positions =
            read_holdings("symbol,quantity,avg_buy_price\nGOOGL,3,1054.68\n".as_bytes()).unwrap();
        assert_eq!(
            positions,
            vec![Position::new(Asset::new("GOOGL"), dec!(3), dec!(1054.68))]
        );
    }

    #[test]
    fn invalid_rows_are_rejected() {
        let as_of = Utc::now();
        assert!(matches!(
            read_prices("symbol,price\nAAPL,0\n".as_bytes(), as_of),
            Err(ParseError::InvalidRecord { line: 2, .. })
        ));
        assert!(matches!(
            read_prices("symbol,price\nAAPL,1\nAAPL,2\n".as_bytes(), as_of),
            Err(ParseError::InvalidRecord { line: 3, .. })
        ));
        assert!(matches!(
            read_prices("symbol,price\n,1\n".as_bytes(), as_of),
            Err(ParseError::InvalidRecord { .. })
        ));
        assert!(matches!(
            read_holdings("symbol,quantity,avg_buy_price\nA,-1,2\n".as_bytes()),
            Err(ParseError::InvalidRecord { .. })
        ));
        assert!(matches!(
            read_prices("symbol,price\nAAPL,cheap\n".as_bytes(), as_of),
            Err(ParseError::Csv(_))
        ));
    }
}
