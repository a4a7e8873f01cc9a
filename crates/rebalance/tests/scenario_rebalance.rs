use chrono::{TimeZone, Utc};
use core_types::{Asset, Order, OrderSide, Position, Quote, Weights};
use executor::{Broker, ExecutorError, Ledger, PortfolioQuery};
use rebalance::{
    ALLOCATION_DESCRIPTION, OrderGenerator, PURCHASE_DESCRIPTION, RebalanceError,
    RebalanceOptions, ResidualCash, SALE_DESCRIPTION,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn quotes(prices: &[(&str, Decimal)]) -> Vec<Quote> {
    let at = Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap();
    prices
        .iter()
        .map(|(symbol, price)| Quote::new(Asset::new(*symbol), *price, at))
        .collect()
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

fn buy_total(orders: &[Order]) -> Decimal {
    orders
        .iter()
        .filter(|o| o.side == OrderSide::Buy)
        .map(Order::value)
        .sum()
}

#[test]
fn scenario_initial_allocation_with_partial_shares() {
    let mut ledger = Ledger::new(dec!(100));
    ledger.set_quotes(quotes(&[("A", dec!(1.0)), ("B", dec!(1.0)), ("C", dec!(1.0))]));
    let desired = weights(&[("A", dec!(0.5)), ("B", dec!(0.25)), ("C", dec!(0.25))]);

    let orders = OrderGenerator::new(RebalanceOptions::partial_shares())
        .rebalance(&ledger, &desired, &assets(&["A", "B", "C"]))
        .unwrap();

    let expected = vec![
        Order::new(ALLOCATION_DESCRIPTION, OrderSide::Buy, Asset::new("A"), dec!(1.0), dec!(50)),
        Order::new(ALLOCATION_DESCRIPTION, OrderSide::Buy, Asset::new("B"), dec!(1.0), dec!(25)),
        Order::new(ALLOCATION_DESCRIPTION, OrderSide::Buy, Asset::new("C"), dec!(1.0), dec!(25)),
    ];
    assert_eq!(orders, expected);

    // Proposing orders does not touch the account.
    assert_eq!(ledger.available_cash().unwrap(), dec!(100));
    assert_eq!(ledger.portfolio(&assets(&["A"])).unwrap().total_value, Decimal::ZERO);
}

#[test]
fn scenario_whole_shares_are_floored() {
    let mut ledger = Ledger::new(dec!(100));
    ledger.set_quotes(quotes(&[("A", dec!(30)), ("B", dec!(20))]));
    let desired = weights(&[("A", dec!(0.5)), ("B", dec!(0.5))]);

    let orders = OrderGenerator::default()
        .rebalance(&ledger, &desired, &assets(&["A", "B"]))
        .unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!((orders[0].asset.symbol.as_str(), orders[0].quantity), ("A", dec!(1)));
    assert_eq!((orders[1].asset.symbol.as_str(), orders[1].quantity), ("B", dec!(2)));
    assert!(orders.iter().all(|o| o.quantity.fract().is_zero()));
    assert_eq!(buy_total(&orders), dec!(70));
}

#[test]
fn scenario_drift_sells_winner_and_buys_laggard() {
    let mut ledger = Ledger::from_holdings(
        dec!(100),
        [
            Position::new(Asset::new("A"), dec!(10), dec!(1)),
            Position::new(Asset::new("B"), dec!(10), dec!(1)),
        ],
    );
    ledger.set_quotes(quotes(&[("A", dec!(3)), ("B", dec!(1))]));
    let desired = weights(&[("A", dec!(0.5)), ("B", dec!(0.5))]);

    let orders = OrderGenerator::default()
        .rebalance(&ledger, &desired, &assets(&["A", "B"]))
        .unwrap();

    let expected = vec![
        Order::new(SALE_DESCRIPTION, OrderSide::Sell, Asset::new("A"), dec!(3), dec!(3)),
        Order::new(PURCHASE_DESCRIPTION, OrderSide::Buy, Asset::new("B"), dec!(1), dec!(10)),
        Order::new(ALLOCATION_DESCRIPTION, OrderSide::Buy, Asset::new("A"), dec!(3), dec!(15)),
        Order::new(ALLOCATION_DESCRIPTION, OrderSide::Buy, Asset::new("B"), dec!(1), dec!(45)),
    ];
    assert_eq!(orders, expected);
    assert_eq!(buy_total(&orders), dec!(100));

    let outcomes = ledger.execute(&orders);
    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(ledger.available_cash().unwrap(), dec!(9));
}

#[test]
fn scenario_unfunded_demand_is_dropped_not_scaled() {
    let mut ledger = Ledger::from_holdings(
        dec!(5),
        [Position::new(Asset::new("A"), dec!(10), dec!(1))],
    );
    ledger.set_quotes(quotes(&[("A", dec!(1)), ("B", dec!(1)), ("C", dec!(1))]));
    let desired = weights(&[("B", dec!(0.5)), ("C", dec!(0.5))]);

    let orders = OrderGenerator::default()
        .rebalance(&ledger, &desired, &assets(&["A", "B", "C"]))
        .unwrap();

    // B is funded first and takes all the cash; C gets nothing this round.
    let expected = vec![
        Order::new(SALE_DESCRIPTION, OrderSide::Sell, Asset::new("A"), dec!(1), dec!(10)),
        Order::new(PURCHASE_DESCRIPTION, OrderSide::Buy, Asset::new("B"), dec!(1), dec!(5)),
    ];
    assert_eq!(orders, expected);
}

#[test]
fn scenario_orders_follow_caller_asset_order() {
    let mut ledger = Ledger::new(dec!(90));
    ledger.set_quotes(quotes(&[("A", dec!(1)), ("B", dec!(1)), ("C", dec!(1))]));
    let desired = weights(&[("A", dec!(0.2)), ("B", dec!(0.3)), ("C", dec!(0.5))]);

    let orders = OrderGenerator::default()
        .rebalance(&ledger, &desired, &assets(&["C", "A", "B"]))
        .unwrap();

    let symbols: Vec<_> = orders.iter().map(|o| o.asset.symbol.as_str()).collect();
    assert_eq!(symbols, ["C", "A", "B"]);
}

#[test]
fn scenario_min_return_gate_suppresses_unprofitable_sells() {
    let holdings = [
        Position::new(Asset::new("A"), dec!(10), dec!(2.5)),
        Position::new(Asset::new("B"), dec!(10), dec!(1)),
    ];
    let mut ledger = Ledger::from_holdings(dec!(0), holdings);
    ledger.set_quotes(quotes(&[("A", dec!(3)), ("B", dec!(1))]));
    let desired = weights(&[("A", dec!(0.5)), ("B", dec!(0.5))]);
    let assets = assets(&["A", "B"]);

    // A returned 20% on its average buy price.
    let strict = OrderGenerator::new(RebalanceOptions::default().with_min_return(dec!(0.25)));
    assert!(strict.rebalance(&ledger, &desired, &assets).unwrap().is_empty());

    let lenient = OrderGenerator::new(RebalanceOptions::default().with_min_return(dec!(0.1)));
    let orders = lenient.rebalance(&ledger, &desired, &assets).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::Sell);
    assert_eq!(orders[0].quantity, dec!(3));

    // A zero threshold disables the gate.
    let disabled = OrderGenerator::new(RebalanceOptions::default().with_min_return(dec!(0)));
    assert_eq!(disabled.rebalance(&ledger, &desired, &assets).unwrap(), orders);
}

#[test]
fn scenario_residual_cash_can_be_held() {
    let mut ledger = Ledger::new(dec!(100));
    ledger.set_quotes(quotes(&[("A", dec!(1))]));
    let generator =
        OrderGenerator::new(RebalanceOptions::default().with_residual_cash(ResidualCash::Hold));

    let orders = generator
        .rebalance(&ledger, &weights(&[("A", dec!(1))]), &assets(&["A"]))
        .unwrap();
    assert!(orders.is_empty());
}

#[test]
fn scenario_buys_never_exceed_available_cash() {
    let price_sets = [
        [dec!(3), dec!(7), dec!(11)],
        [dec!(0.33), dec!(19.99), dec!(250)],
        [dec!(1), dec!(1), dec!(1)],
    ];
    let weight_sets = [
        [dec!(0.5), dec!(0.3), dec!(0.2)],
        [dec!(0.6), dec!(0.6), dec!(0.6)],
        [dec!(1), dec!(0), dec!(0)],
    ];
    let symbols = ["A", "B", "C"];

    for prices in &price_sets {
        for target in &weight_sets {
            for options in [RebalanceOptions::default(), RebalanceOptions::partial_shares()] {
                let cash = dec!(997.13);
                let mut ledger = Ledger::from_holdings(
                    cash,
                    [Position::new(Asset::new("A"), dec!(40), dec!(1))],
                );
                ledger.set_quotes(quotes(&[
                    (symbols[0], prices[0]),
                    (symbols[1], prices[1]),
                    (symbols[2], prices[2]),
                ]));
                let desired: Weights = symbols
                    .iter()
                    .zip(target)
                    .map(|(s, w)| (Asset::new(*s), *w))
                    .collect();

                let orders = OrderGenerator::new(options)
                    .rebalance(&ledger, &desired, &assets(&symbols))
                    .unwrap();
                assert!(buy_total(&orders) <= cash, "{:?}", orders);
            }
        }
    }
}

#[test]
fn scenario_half_share_is_only_produced_with_partial_shares() {
    let mut ledger = Ledger::new(dec!(1));
    ledger.set_quotes(quotes(&[("A", dec!(2))]));
    let desired = weights(&[("A", dec!(1))]);

    let whole = OrderGenerator::default()
        .rebalance(&ledger, &desired, &assets(&["A"]))
        .unwrap();
    assert!(whole.is_empty());

    let partial = OrderGenerator::new(RebalanceOptions::partial_shares())
        .rebalance(&ledger, &desired, &assets(&["A"]))
        .unwrap();
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].quantity, dec!(0.5));

    // The ledger only executes whole shares.
    let outcomes = ledger.execute(&partial);
    assert!(matches!(outcomes[0], Err(ExecutorError::InvalidOrder(_))));
}

#[test]
fn scenario_missing_quote_aborts() {
    let mut ledger = Ledger::new(dec!(100));
    ledger.set_quotes(quotes(&[("A", dec!(1))]));

    let err = OrderGenerator::default()
        .rebalance(&ledger, &weights(&[("A", dec!(1))]), &assets(&["A", "B"]))
        .unwrap_err();
    assert_eq!(
        err,
        RebalanceError::Executor(ExecutorError::UnknownQuote(Asset::new("B")))
    );
}

#[test]
fn scenario_zero_price_aborts() {
    let mut ledger = Ledger::new(dec!(100));
    ledger.set_quotes(quotes(&[("A", dec!(0))]));

    let err = OrderGenerator::default()
        .rebalance(&ledger, &weights(&[("A", dec!(1))]), &assets(&["A"]))
        .unwrap_err();
    assert!(matches!(err, RebalanceError::InvalidPrice { .. }));
}
