use crate::error::RebalanceError;
use core_types::{Asset, Order, OrderSide, PortfolioSnapshot, Position, Weights};
use executor::PortfolioQuery;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PURCHASE_DESCRIPTION: &str = "Purchase of missing stocks";
pub const SALE_DESCRIPTION: &str = "Sale of excess stocks";
pub const ALLOCATION_DESCRIPTION: &str = "Allocation of unbound cash";

/// Fractional quantities are truncated to this many decimal places.
const PARTIAL_SHARE_DP: u32 = 8;

/// What to do with cash that is still unspent after the rebalance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualCash {
    /// Buy more of every asset, split by the target weights.
    #[default]
    Allocate,
    /// Leave it in the account.
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RebalanceOptions {
    /// Emit fractional quantities instead of whole shares.
    pub allow_partial_shares: bool,
    /// Suppress sells whose return against the average buy price is below this fraction.
    /// `None` or a non-positive value disables the gate.
    pub min_return: Option<Decimal>,
    pub residual_cash: ResidualCash,
}

impl RebalanceOptions {
    pub fn partial_shares() -> Self {
        Self {
            allow_partial_shares: true,
            ..Self::default()
        }
    }

    pub fn with_min_return(mut self, threshold: Decimal) -> Self {
        self.min_return = Some(threshold);
        self
    }

    pub fn with_residual_cash(mut self, residual_cash: ResidualCash) -> Self {
        self.residual_cash = residual_cash;
        self
    }

    fn active_min_return(&self) -> Option<Decimal> {
        self.min_return.filter(|threshold| *threshold > Decimal::ZERO)
    }
}

impl From<&configuration::Rebalance> for RebalanceOptions {
    fn from(settings: &configuration::Rebalance) -> Self {
        Self {
            allow_partial_shares: settings.allow_partial_shares,
            min_return: settings.active_min_return(),
            residual_cash: if settings.allocate_residual_cash {
                ResidualCash::Allocate
            } else {
                ResidualCash::Hold
            },
        }
    }
}

/// Computes the orders that move an account towards a set of target weights.
///
/// Orders are produced in the order of the caller's asset list: first one rebalance order per
/// asset that is off target, then (optionally) buys that spend the cash left over. Buys in
/// the rebalance pass are funded first come first served; demand beyond the available cash is
/// dropped for this round rather than scaled down across assets.
#[derive(Debug, Clone, Default)]
pub struct OrderGenerator {
    options: RebalanceOptions,
}

impl OrderGenerator {
    pub fn new(options: RebalanceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RebalanceOptions {
        &self.options
    }

    /// Proposes the orders that rebalance `assets` towards `desired`.
    ///
    /// The account is only queried. The combined value of all proposed buys never exceeds
    /// the cash available when the call starts, regardless of any sells in the same batch.
    /// Any failure while reading the account aborts the call.
    pub fn rebalance<Q>(
        &self,
        account: &Q,
        desired: &Weights,
        assets: &[Asset],
    ) -> Result<Vec<Order>, RebalanceError>
    where
        Q: PortfolioQuery + ?Sized,
    {
        let cash = account.available_cash()?;
        let snapshot = account.portfolio(assets)?;
        let held: HashMap<Asset, Position> = account
            .positions(&snapshot.assets)?
            .into_iter()
            .map(|position| (position.asset.clone(), position))
            .collect();
        tracing::debug!(
            %cash,
            total_value = %snapshot.total_value,
            assets = snapshot.assets.len(),
            "Rebalancing portfolio"
        );

        let diff = desired.diff(&snapshot.weights);
        let mut remaining = cash;
        let mut orders = Vec::new();

        for asset in &snapshot.assets {
            let trade_value = snapshot.total_value * diff.get(asset);
            if trade_value >= Decimal::ZERO {
                let value = trade_value.min(remaining);
                remaining -= value;
                let price = price_of(&snapshot, asset)?;
                if let Some(quantity) = self.quantity(asset, value, price)? {
                    orders.push(Order::new(
                        PURCHASE_DESCRIPTION,
                        OrderSide::Buy,
                        asset.clone(),
                        price,
                        quantity,
                    ));
                }
                continue;
            }

            let price = price_of(&snapshot, asset)?;
            let position = held
                .get(asset)
                .cloned()
                .unwrap_or_else(|| Position::empty(asset.clone()));
            if let Some(threshold) = self.options.active_min_return() {
                if let Some(realized) = position.return_at(price) {
                    if realized < threshold {
                        tracing::debug!(%asset, %realized, %threshold, "Sell suppressed by minimum return");
                        continue;
                    }
                }
            }
            let Some(quantity) = self.quantity(asset, -trade_value, price)? else {
                continue;
            };
            let sellable = if self.options.allow_partial_shares {
                position.quantity
            } else {
                position.quantity.floor()
            };
            let quantity = quantity.min(sellable);
            if quantity <= Decimal::ZERO {
                continue;
            }
            orders.push(Order::new(
                SALE_DESCRIPTION,
                OrderSide::Sell,
                asset.clone(),
                price,
                quantity,
            ));
        }

        if self.options.residual_cash == ResidualCash::Allocate && remaining > Decimal::ZERO {
            let pool = remaining;
            tracing::debug!(residual = %pool, "Allocating unbound cash");
            for asset in &snapshot.assets {
                let value = (pool * desired.get(asset)).min(remaining);
                if value <= Decimal::ZERO {
                    continue;
                }
                let price = price_of(&snapshot, asset)?;
                if let Some(quantity) = self.quantity(asset, value, price)? {
                    remaining -= price * quantity;
                    orders.push(Order::new(
                        ALLOCATION_DESCRIPTION,
                        OrderSide::Buy,
                        asset.clone(),
                        price,
                        quantity,
                    ));
                }
            }
        }

        Ok(orders)
    }

    /// Converts a trade value into a quantity at `price`.
    ///
    /// Whole-share mode floors and drops anything below one share. Partial-share mode truncates
    /// so that `quantity * price` never exceeds `value`.
    fn quantity(
        &self,
        asset: &Asset,
        value: Decimal,
        price: Decimal,
    ) -> Result<Option<Decimal>, RebalanceError> {
        if value <= Decimal::ZERO {
            return Ok(None);
        }
        if price <= Decimal::ZERO {
            return Err(RebalanceError::InvalidPrice {
                asset: asset.clone(),
                price,
            });
        }
        let raw = value.checked_div(price).ok_or_else(|| {
            RebalanceError::Calculation(format!("{} / {} overflows for {}", value, price, asset))
        })?;

        let quantity = if self.options.allow_partial_shares {
            raw.round_dp_with_strategy(PARTIAL_SHARE_DP, RoundingStrategy::ToZero)
        } else {
            raw.floor()
        };
        let minimum_met = if self.options.allow_partial_shares {
            quantity > Decimal::ZERO
        } else {
            quantity >= Decimal::ONE
        };
        Ok(minimum_met.then_some(quantity))
    }
}

fn price_of(snapshot: &PortfolioSnapshot, asset: &Asset) -> Result<Decimal, RebalanceError> {
    snapshot
        .price(asset)
        .ok_or_else(|| RebalanceError::MissingPrice(asset.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor::ExecutorError;
    use rust_decimal_macros::dec;

    /// An account whose state is fixed up front.
    struct FixedAccount {
        cash: Decimal,
        snapshot: PortfolioSnapshot,
        positions: Vec<Position>,
    }

    impl FixedAccount {
        fn new(cash: Decimal, holdings: &[(&str, Decimal, Decimal, Decimal)]) -> Self {
            let mut quantities = HashMap::new();
            let mut prices = HashMap::new();
            let mut positions = Vec::new();
            let mut assets = Vec::new();
            for (symbol, quantity, avg_buy_price, price) in holdings {
                let asset = Asset::new(*symbol);
                quantities.insert(asset.clone(), *quantity);
                prices.insert(asset.clone(), *price);
                positions.push(Position::new(asset.clone(), *quantity, *avg_buy_price));
                assets.push(asset);
            }
            let total_value: Decimal = assets.iter().map(|a| quantities[a] * prices[a]).sum();
            let weights = assets
                .iter()
                .map(|a| {
                    let weight = if total_value.is_zero() {
                        Decimal::ZERO
                    } else {
                        quantities[a] * prices[a] / total_value
                    };
                    (a.clone(), weight)
                })
                .collect();
            Self {
                cash,
                snapshot: PortfolioSnapshot {
                    weights,
                    quantities,
                    prices,
                    total_value,
                    assets,
                },
                positions,
            }
        }
    }

    impl PortfolioQuery for FixedAccount {
        fn available_cash(&self) -> Result<Decimal, ExecutorError> {
            Ok(self.cash)
        }

        fn positions(&self, assets: &[Asset]) -> Result<Vec<Position>, ExecutorError> {
            Ok(assets
                .iter()
                .map(|asset| {
                    self.positions
                        .iter()
                        .find(|p| &p.asset == asset)
                        .cloned()
                        .unwrap_or_else(|| Position::empty(asset.clone()))
                })
                .collect())
        }

        fn portfolio(&self, _assets: &[Asset]) -> Result<PortfolioSnapshot, ExecutorError> {
            Ok(self.snapshot.clone())
        }
    }

    fn weights(entries: &[(&str, Decimal)]) -> Weights {
        entries
            .iter()
            .map(|(symbol, weight)| (Asset::new(*symbol), *weight))
            .collect()
    }

    fn assets(symbols: &[&str]) -> Vec<Asset> {
        symbols.iter().map(|s| Asset::new(*s)).collect()
    }

    #[test]
    fn on_target_portfolio_produces_no_orders() {
        let account = FixedAccount::new(
            dec!(0),
            &[("A", dec!(5), dec!(1), dec!(2)), ("B", dec!(10), dec!(1), dec!(1))],
        );
        let orders = OrderGenerator::default()
            .rebalance(&account, &weights(&[("A", dec!(0.5)), ("B", dec!(0.5))]), &assets(&["A", "B"]))
            .unwrap();
        assert!(orders.is_empty());
    }

    #[test]
    fn quantity_floors_in_whole_share_mode() {
        let generator = OrderGenerator::default();
        let a = Asset::new("A");
        assert_eq!(generator.quantity(&a, dec!(59.99), dec!(20)).unwrap(), Some(dec!(2)));
        assert_eq!(generator.quantity(&a, dec!(19.99), dec!(20)).unwrap(), None);
        assert_eq!(generator.quantity(&a, dec!(0), dec!(20)).unwrap(), None);
    }

    #[test]
    fn quantity_truncates_in_partial_share_mode() {
        let generator = OrderGenerator::new(RebalanceOptions::partial_shares());
        let a = Asset::new("A");
        let quantity = generator.quantity(&a, dec!(100), dec!(3)).unwrap().unwrap();
        assert_eq!(quantity, dec!(33.33333333));
        assert!(quantity * dec!(3) <= dec!(100));
    }

    #[test]
    fn non_positive_price_is_rejected_when_trading() {
        let generator = OrderGenerator::default();
        let a = Asset::new("A");
        assert_eq!(
            generator.quantity(&a, dec!(10), dec!(0)),
            Err(RebalanceError::InvalidPrice {
                asset: a.clone(),
                price: dec!(0)
            })
        );
        // Nothing to trade, nothing to price.
        assert_eq!(generator.quantity(&a, dec!(0), dec!(0)), Ok(None));
    }

    #[test]
    fn sell_is_capped_at_whole_held_shares() {
        // 2.5 shares of A at 1.0, target is all B.
        let account = FixedAccount::new(
            dec!(0),
            &[("A", dec!(2.5), dec!(1), dec!(1)), ("B", dec!(0), dec!(0), dec!(1))],
        );
        let orders = OrderGenerator::default()
            .rebalance(&account, &weights(&[("B", dec!(1))]), &assets(&["A", "B"]))
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].quantity, dec!(2));
    }

    #[test]
    fn min_return_gate_ignores_positions_without_cost_basis() {
        let account = FixedAccount::new(
            dec!(0),
            &[("A", dec!(10), dec!(0), dec!(1)), ("B", dec!(0), dec!(0), dec!(1))],
        );
        let generator =
            OrderGenerator::new(RebalanceOptions::default().with_min_return(dec!(0.5)));
        let orders = generator
            .rebalance(&account, &weights(&[("A", dec!(0.5)), ("B", dec!(0.5))]), &assets(&["A", "B"]))
            .unwrap();
        assert_eq!(orders, vec![Order::new(SALE_DESCRIPTION, OrderSide::Sell, Asset::new("A"), dec!(1), dec!(5))]);
    }

    #[test]
    fn options_follow_configuration() {
        let settings = configuration::Rebalance {
            allow_partial_shares: true,
            min_return: Some(dec!(0)),
            allocate_residual_cash: false,
        };
        let options = RebalanceOptions::from(&settings);
        assert!(options.allow_partial_shares);
        assert_eq!(options.min_return, None);
        assert_eq!(options.residual_cash, ResidualCash::Hold);
    }
}
