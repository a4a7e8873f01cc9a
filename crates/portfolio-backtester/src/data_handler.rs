use crate::error::BacktestError;
use chrono::{DateTime, Utc};
use core_types::{Asset, Quote};
use std::collections::{BTreeMap, HashSet};

/// Price history arranged for replay: one row per period, one quote per asset in asset order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteMatrix {
    assets: Vec<Asset>,
    periods: Vec<Vec<Quote>>,
}

impl QuoteMatrix {
    /// Builds a matrix from per-asset series (`series[asset][period]`), as a quote provider
    /// delivers them.
    ///
    /// Every asset needs exactly one series, all series must have the same non-zero length,
    /// and each quote must belong to the asset of its series.
    pub fn from_asset_series(
        assets: Vec<Asset>,
        series: Vec<Vec<Quote>>,
    ) -> Result<Self, BacktestError> {
        validate_assets(&assets)?;
        if series.len() != assets.len() {
            return Err(BacktestError::Data(format!(
                "expected {} quote series, got {}",
                assets.len(),
                series.len()
            )));
        }

        let periods = series[0].len();
        if periods == 0 {
            return Err(BacktestError::Data(format!("no quotes for {}", assets[0])));
        }
        for (asset, quotes) in assets.iter().zip(&series) {
            if quotes.len() != periods {
                return Err(BacktestError::Data(format!(
                    "{} has {} quotes, expected {}",
                    asset,
                    quotes.len(),
                    periods
                )));
            }
            if let Some(stray) = quotes.iter().find(|q| &q.asset != asset) {
                return Err(BacktestError::Data(format!(
                    "series for {} contains a quote for {}",
                    asset, stray.asset
                )));
            }
        }

        // Transpose [asset][period] into [period][asset].
        let mut columns: Vec<_> = series.into_iter().map(Vec::into_iter).collect();
        let rows = (0..periods)
            .map(|_| columns.iter_mut().filter_map(|column| column.next()).collect())
            .collect();

        Ok(Self {
            assets,
            periods: rows,
        })
    }

    /// Builds a matrix from rows that are already period-major (`periods[period][asset]`).
    pub fn from_periods(
        assets: Vec<Asset>,
        periods: Vec<Vec<Quote>>,
    ) -> Result<Self, BacktestError> {
        validate_assets(&assets)?;
        if periods.is_empty() {
            return Err(BacktestError::Data("no periods to replay".to_string()));
        }
        for (period, row) in periods.iter().enumerate() {
            let aligned = row.len() == assets.len()
                && row.iter().zip(&assets).all(|(quote, asset)| &quote.asset == asset);
            if !aligned {
                return Err(BacktestError::Data(format!(
                    "period {} does not hold exactly one quote per asset in asset order",
                    period
                )));
            }
        }
        Ok(Self { assets, periods })
    }

    /// Builds a matrix from per-asset series whose dates may differ, e.g. daily closes of
    /// stocks listed on different days. Only timestamps present in every series are kept.
    pub fn from_unaligned_series(
        assets: Vec<Asset>,
        series: Vec<Vec<Quote>>,
    ) -> Result<Self, BacktestError> {
        validate_assets(&assets)?;
        if series.len() != assets.len() {
            return Err(BacktestError::Data(format!(
                "expected {} quote series, got {}",
                assets.len(),
                series.len()
            )));
        }

        let mut common: Option<HashSet<DateTime<Utc>>> = None;
        for quotes in &series {
            let stamps: HashSet<_> = quotes.iter().map(|q| q.timestamp).collect();
            common = Some(match common {
                Some(acc) => acc.intersection(&stamps).copied().collect(),
                None => stamps,
            });
        }
        let common = common.unwrap_or_default();

        let aligned: Vec<Vec<Quote>> = series
            .into_iter()
            .map(|quotes| {
                // Sorted by timestamp; a duplicated timestamp keeps its last quote.
                let by_time: BTreeMap<_, _> = quotes
                    .into_iter()
                    .filter(|q| common.contains(&q.timestamp))
                    .map(|q| (q.timestamp, q))
                    .collect();
                by_time.into_values().collect()
            })
            .collect();

        let kept = aligned.first().map(Vec::len).unwrap_or_default();
        tracing::debug!(periods = kept, "Aligned quote series on common dates");
        if kept == 0 {
            return Err(BacktestError::Data(
                "the quote series have no dates in common".to_string(),
            ));
        }
        Self::from_asset_series(assets, aligned)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, index: usize) -> Option<&[Quote]> {
        self.periods.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Quote]> {
        self.periods.iter().map(Vec::as_slice)
    }

    /// The timestamp of a period, taken from its first quote.
    pub fn timestamp(&self, index: usize) -> Option<DateTime<Utc>> {
        self.periods
            .get(index)
            .and_then(|row| row.first())
            .map(|quote| quote.timestamp)
    }
}

fn validate_assets(assets: &[Asset]) -> Result<(), BacktestError> {
    if assets.is_empty() {
        return Err(BacktestError::Data("no assets to backtest".to_string()));
    }
    let mut seen = HashSet::with_capacity(assets.len());
    for asset in assets {
        if asset.is_empty() {
            return Err(BacktestError::Data("asset without a symbol".to_string()));
        }
        if !seen.insert(asset) {
            return Err(BacktestError::Data(format!("{} is listed twice", asset)));
        }
    }
    Ok(())
}
