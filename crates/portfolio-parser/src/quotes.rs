use crate::error::ParseError;
use crate::{line_of, open};
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{Asset, Quote};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const DATE_COLUMN: &str = "date";
const CLOSE_COLUMN: &str = "close";

/// Reads a daily price history with `date` and `close` columns. Other columns are ignored.
///
/// Dates may be plain (`2019-01-02`) or RFC 3339 timestamps. The result is sorted oldest
/// first regardless of the order in the file.
pub fn read_daily_quotes(reader: impl Read, asset: &Asset) -> Result<Vec<Quote>, ParseError> {
    let mut rows = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rows.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseError::MissingSection(format!("column '{}' for {}", name, asset)))
    };
    let date_idx = column(DATE_COLUMN)?;
    let close_idx = column(CLOSE_COLUMN)?;

    let mut quotes = Vec::new();
    for record in rows.records() {
        let record = record?;
        let line = line_of(&record);
        let invalid = |reason: String| ParseError::InvalidRecord { line, reason };

        let raw_date = record.get(date_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_date)
            .ok_or_else(|| invalid(format!("unrecognized date '{}'", raw_date)))?;
        let raw_close = record.get(close_idx).unwrap_or_default();
        let price = Decimal::from_str(raw_close)
            .map_err(|e| invalid(format!("close '{}': {}", raw_close, e)))?;
        if price <= Decimal::ZERO {
            return Err(invalid(format!("close of {} must be positive, got {}", asset, price)));
        }
        quotes.push(Quote::new(asset.clone(), price, timestamp));
    }

    quotes.sort_by_key(|q| q.timestamp);
    Ok(quotes)
}

/// Loads `<dir>/<SYMBOL>.csv` for one asset.
pub fn load_daily_quotes(dir: &Path, asset: &Asset) -> Result<Vec<Quote>, ParseError> {
    let path = dir.join(format!("{}.csv", asset.symbol));
    let quotes = read_daily_quotes(open(&path)?, asset)?;
    if quotes.is_empty() {
        return Err(ParseError::MissingSection(format!(
            "no quotes in {}",
            path.display()
        )));
    }
    tracing::debug!(%asset, quotes = quotes.len(), path = %path.display(), "Loaded daily quotes");
    Ok(quotes)
}

/// Loads one series per asset, in asset order.
pub fn load_quote_series(dir: &Path, assets: &[Asset]) -> Result<Vec<Vec<Quote>>, ParseError> {
    assets
        .iter()
        .map(|asset| load_daily_quotes(dir, asset))
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn accepts_plain_dates_and_timestamps() {
        let midnight = Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2019-01-02"), Some(midnight));
        assert_eq!(parse_timestamp("2019-01-02T00:00:00.000Z"), Some(midnight));
        assert_eq!(parse_timestamp("2019-01-02T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_timestamp("02/01/2019"), None);
    }

    #[test]
    fn sorts_and_ignores_extra_columns() {
        let csv = "Date,Open,Close,Volume\n\
                   2019-01-03,10,11.5,100\n\
                   2019-01-02,9,10.25,100\n";
        let quotes = read_daily_quotes(csv.as_bytes(), &Asset::new("AAA")).unwrap();
        let prices: Vec<_> = quotes.iter().map(|q| q.price).collect();
        assert_eq!(prices, vec![dec!(10.25), dec!(11.5)]);
        assert!(quotes.iter().all(|q| q.asset == Asset::new("AAA")));
    }

    #[test]
    fn missing_close_column_is_an_error() {
        let err = read_daily_quotes("date,open\n2019-01-02,1\n".as_bytes(), &Asset::new("AAA"))
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingSection(_)));
    }

    #[test]
    fn non_positive_close_is_rejected() {
        let err = read_daily_quotes("date,close\n2019-01-02,0\n".as_bytes(), &Asset::new("AAA"))
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidRecord { line: 2, .. }));
    }
}
