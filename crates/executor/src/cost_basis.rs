use core_types::{CostBasisMethod, Order, OrderSide, Position};

/// Computes the position that results from filling `order` against `held`.
///
/// `held` is the current position, or `Position::empty` when the asset is not held. The order
/// must already have passed validation (positive price, quantity at least one, and for sells no
/// more than the held quantity).
///
/// Returns `None` when a sell liquidates the position; a zero-quantity position is never
/// produced, so the division in the next update can never be by zero.
pub fn apply_fill(held: &Position, order: &Order, method: CostBasisMethod) -> Option<Position> {
    match order.side {
        OrderSide::Buy => {
            let quantity = held.quantity + order.quantity;
            let avg_buy_price =
                (held.avg_buy_price * held.quantity + order.price * order.quantity) / quantity;
            Some(Position::new(order.asset.clone(), quantity, avg_buy_price))
        }
        OrderSide::Sell => {
            let quantity = held.quantity - order.quantity;
            if quantity.is_zero() {
                return None;
            }
            let avg_buy_price = match method {
                CostBasisMethod::NetProceeds => {
                    (held.avg_buy_price * held.quantity - order.price * order.quantity) / quantity
                }
                CostBasisMethod::AverageCost => held.avg_buy_price,
            };
            Some(Position::new(order.asset.clone(), quantity, avg_buy_price))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Asset;
    use rust_decimal_macros::dec;

    fn googl() -> Asset {
        Asset::new("GOOGL")
    }

    #[test]
    fn first_buy_opens_position_at_order_price() {
        let held = Position::empty(googl());
        let order = Order::buy(googl(), dec!(100), dec!(2));

        let position = apply_fill(&held, &order, CostBasisMethod::NetProceeds).unwrap();
        assert_eq!(position.quantity, dec!(2));
        assert_eq!(position.avg_buy_price, dec!(100));
    }

    #[test]
    fn buy_averages_cost_basis() {
        let held = Position::new(googl(), dec!(1), dec!(50));
        let order = Order::buy(googl(), dec!(110), dec!(3));

        let position = apply_fill(&held, &order, CostBasisMethod::NetProceeds).unwrap();
        assert_eq!(position.quantity, dec!(4));
        assert_eq!(position.avg_buy_price, dec!(95));
    }

    #[test]
    fn full_liquidation_removes_position() {
        let held = Position::new(googl(), dec!(3), dec!(42));
        let order = Order::sell(googl(), dec!(10), dec!(3));

        assert_eq!(apply_fill(&held, &order, CostBasisMethod::NetProceeds), None);
        assert_eq!(apply_fill(&held, &order, CostBasisMethod::AverageCost), None);
    }

    #[test]
    fn net_proceeds_sell_deducts_proceeds_from_basis() {
        let held = Position::new(googl(), dec!(2), dec!(50));
        let order = Order::sell(googl(), dec!(20), dec!(1));

        let position = apply_fill(&held, &order, CostBasisMethod::NetProceeds).unwrap();
        assert_eq!(position.quantity, dec!(1));
        assert_eq!(position.avg_buy_price, dec!(80));
    }

    #[test]
    fn average_cost_sell_keeps_basis() {
        let held = Position::new(googl(), dec!(2), dec!(50));
        let order = Order::sell(googl(), dec!(20), dec!(1));

        let position = apply_fill(&held, &order, CostBasisMethod::AverageCost).unwrap();
        assert_eq!(position.quantity, dec!(1));
        assert_eq!(position.avg_buy_price, dec!(50));
    }

    #[test]
    fn partial_sell_at_average_price_keeps_basis_under_both_methods() {
        let held = Position::new(googl(), dec!(10), dec!(25));
        let order = Order::sell(googl(), dec!(25), dec!(4));

        for method in [CostBasisMethod::NetProceeds, CostBasisMethod::AverageCost] {
            let position = apply_fill(&held, &order, method).unwrap();
            assert_eq!(position.quantity, dec!(6));
            assert_eq!(position.avg_buy_price, dec!(25));
        }
    }
}
