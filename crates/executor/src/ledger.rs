use crate::broker::{Broker, OrderOutcome, PortfolioQuery};
use crate::cost_basis::apply_fill;
use crate::error::ExecutorError;
use core_types::{
    Asset, CostBasisMethod, Order, OrderSide, PortfolioSnapshot, Position, Quote, Weights,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// The simulated brokerage account used for backtesting.
///
/// Owns the cash balance, the open positions and the latest price snapshot. Callers only
/// ever get copies of this state back. A ledger is not synchronized internally; all calls
/// on one instance must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct Ledger {
    cash: Decimal,
    positions: HashMap<Asset, Position>,
    quotes: HashMap<Asset, Quote>,
    cost_basis: CostBasisMethod,
}

impl Ledger {
    /// Creates a new `Ledger` with a given amount of starting cash and no positions.
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            positions: HashMap::new(),
            quotes: HashMap::new(),
            cost_basis: CostBasisMethod::default(),
        }
    }

    /// Creates a ledger that already holds `positions`. Entries with a zero quantity are dropped.
    pub fn from_holdings(cash: Decimal, positions: impl IntoIterator<Item = Position>) -> Self {
        let mut ledger = Self::new(cash);
        for position in positions {
            if position.quantity.is_zero() {
                tracing::debug!(asset = %position.asset, "Skipping zero-quantity holding");
                continue;
            }
            ledger.positions.insert(position.asset.clone(), position);
        }
        ledger
    }

    pub fn with_cost_basis(mut self, method: CostBasisMethod) -> Self {
        self.cost_basis = method;
        self
    }

    pub fn cost_basis(&self) -> CostBasisMethod {
        self.cost_basis
    }

    /// Replaces the price snapshot entirely. Assets missing from `quotes` become unpriced.
    pub fn set_quotes(&mut self, quotes: impl IntoIterator<Item = Quote>) {
        self.quotes = quotes
            .into_iter()
            .map(|quote| (quote.asset.clone(), quote))
            .collect();
    }

    /// Cash that is not bound in positions. Infallible for the simulated account.
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    fn position_or_empty(&self, asset: &Asset) -> Position {
        self.positions
            .get(asset)
            .cloned()
            .unwrap_or_else(|| Position::empty(asset.clone()))
    }

    /// Validates and applies a single order. The checks run in a fixed order and the first
    /// failing one is reported; a rejected order leaves the ledger untouched.
    fn execute_order(&mut self, order: &Order) -> OrderOutcome {
        let asset = &order.asset;
        if asset.is_empty() {
            return Err(ExecutorError::InvalidOrder("no asset set".to_string()));
        }
        if order.price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidOrder(format!(
                "invalid price for {}: {}",
                asset, order.price
            )));
        }
        if order.quantity < Decimal::ONE {
            return Err(ExecutorError::InvalidOrder(format!(
                "quantity of {} for {} is less than 1",
                order.quantity, asset
            )));
        }

        let held = match (self.positions.get(asset), order.side) {
            (None, OrderSide::Sell) => return Err(ExecutorError::NoPosition(asset.clone())),
            (Some(position), _) => position.clone(),
            (None, OrderSide::Buy) => Position::empty(asset.clone()),
        };

        let value = order.value();
        match order.side {
            OrderSide::Buy if value > self.cash => {
                return Err(ExecutorError::InsufficientCash {
                    asset: asset.clone(),
                    required: value,
                    available: self.cash,
                });
            }
            OrderSide::Sell if order.quantity > held.quantity => {
                return Err(ExecutorError::InsufficientPosition {
                    asset: asset.clone(),
                    requested: order.quantity,
                    held: held.quantity,
                });
            }
            _ => {}
        }

        match apply_fill(&held, order, self.cost_basis) {
            Some(position) => {
                self.positions.insert(asset.clone(), position);
            }
            None => {
                self.positions.remove(asset);
            }
        }
        match order.side {
            OrderSide::Buy => self.cash -= value,
            OrderSide::Sell => self.cash += value,
        }
        Ok(())
    }
}

impl PortfolioQuery for Ledger {
    fn available_cash(&self) -> Result<Decimal, ExecutorError> {
        Ok(self.cash)
    }

    fn positions(&self, assets: &[Asset]) -> Result<Vec<Position>, ExecutorError> {
        Ok(assets
            .iter()
            .map(|asset| self.position_or_empty(asset))
            .collect())
    }

    fn portfolio(&self, assets: &[Asset]) -> Result<PortfolioSnapshot, ExecutorError> {
        let mut seen = HashSet::with_capacity(assets.len());
        let mut ordered = Vec::with_capacity(assets.len());
        let mut quantities = HashMap::with_capacity(assets.len());
        let mut prices = HashMap::with_capacity(assets.len());

        for asset in assets {
            if !seen.insert(asset) {
                continue;
            }
            let quote = self
                .quotes
                .get(asset)
                .ok_or_else(|| ExecutorError::UnknownQuote(asset.clone()))?;
            let quantity = self
                .positions
                .get(asset)
                .map(|p| p.quantity)
                .unwrap_or_default();
            quantities.insert(asset.clone(), quantity);
            prices.insert(asset.clone(), quote.price);
            ordered.push(asset.clone());
        }

        let total_value: Decimal = ordered
            .iter()
            .map(|asset| quantities[asset] * prices[asset])
            .sum();

        let weights: Weights = ordered
            .iter()
            .map(|asset| {
                let weight = if total_value.is_zero() {
                    Decimal::ZERO
                } else {
                    quantities[asset] * prices[asset] / total_value
                };
                (asset.clone(), weight)
            })
            .collect();

        Ok(PortfolioSnapshot {
            weights,
            quantities,
            prices,
            total_value,
            assets: ordered,
        })
    }
}

impl Broker for Ledger {
    fn execute(&mut self, orders: &[Order]) -> Vec<OrderOutcome> {
        orders
            .iter()
            .map(|order| {
                let outcome = self.execute_order(order);
                match &outcome {
                    Ok(()) => tracing::debug!(cash = %self.cash, "Executed {}", order),
                    Err(e) => tracing::warn!(error = %e, "Rejected {}", order),
                }
                outcome
            })
            .collect()
    }

    fn quotes(&self, assets: &[Asset]) -> Result<Vec<Quote>, ExecutorError> {
        assets
            .iter()
            .map(|asset| {
                self.quotes
                    .get(asset)
                    .cloned()
                    .ok_or_else(|| ExecutorError::UnknownQuote(asset.clone()))
            })
            .collect()
    }
}
