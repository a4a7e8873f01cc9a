use crate::structs::Asset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map;

/// Target (or actual) fraction of total value per asset.
///
/// Weights are not required to sum to one. Iteration order is unspecified; anything that
/// produces an ordered sequence must walk an explicit asset list instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(HashMap<Asset, Decimal>);

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset, weight: Decimal) -> Option<Decimal> {
        self.0.insert(asset, weight)
    }

    /// The weight of `asset`, or zero when it is absent.
    pub fn get(&self, asset: &Asset) -> Decimal {
        self.0.get(asset).copied().unwrap_or_default()
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        self.0.contains_key(asset)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Asset, Decimal> {
        self.0.iter()
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// `self - other` over the union of both key sets, treating a missing key as zero.
    pub fn diff(&self, other: &Weights) -> WeightsDiff {
        let mut diff: HashMap<Asset, Decimal> = self.0.clone();
        for (asset, weight) in &other.0 {
            *diff.entry(asset.clone()).or_default() -= *weight;
        }
        WeightsDiff(diff)
    }
}

impl FromIterator<(Asset, Decimal)> for Weights {
    fn from_iter<I: IntoIterator<Item = (Asset, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Weights {
    type Item = (&'a Asset, &'a Decimal);
    type IntoIter = hash_map::Iter<'a, Asset, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Per-asset `desired - actual` weight delta.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightsDiff(HashMap<Asset, Decimal>);

impl WeightsDiff {
    /// The delta for `asset`, or zero when it is in neither input.
    pub fn get(&self, asset: &Asset) -> Decimal {
        self.0.get(asset).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Asset, Decimal> {
        self.0.iter()
    }
}
