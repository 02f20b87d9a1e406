//! Portfolio — aggregate state of cash + all open positions.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::fill::Fill;
use super::order::OrderSide;
use super::position::Position;

/// Aggregate portfolio state.
///
/// The accounting identity holds after every fill:
/// `equity == cash + sum(position market values)`.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: Decimal,
    pub initial_capital: Decimal,
    pub positions: HashMap<String, Position>,
    pub total_commission: Decimal,
    pub total_slippage: Decimal,
    pub realized_pnl: Decimal,
}

impl Portfolio {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            total_commission: Decimal::ZERO,
            total_slippage: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    /// Total equity = cash + sum of all position market values.
    ///
    /// Symbols without a price are valued at their average entry price.
    pub fn equity(&self, prices: &HashMap<String, Decimal>) -> Decimal {
        let position_value: Decimal = self
            .positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.symbol).copied().unwrap_or(pos.avg_entry_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Held quantity, zero when flat or unknown.
    pub fn quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(|p| !p.is_flat())
    }

    /// Fraction of equity held in each open position.
    pub fn weights(&self, prices: &HashMap<String, Decimal>) -> BTreeMap<String, Decimal> {
        let equity = self.equity(prices);
        if equity <= Decimal::ZERO {
            return BTreeMap::new();
        }
        self.positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| {
                let price = prices.get(&p.symbol).copied().unwrap_or(p.avg_entry_price);
                (p.symbol.clone(), p.market_value(price) / equity)
            })
            .collect()
    }

    /// Apply a fill to cash, holdings and cost totals.
    pub fn apply_fill(&mut self, fill: &Fill) {
        self.cash += fill.cash_delta();
        self.total_commission += fill.commission();
        self.total_slippage += fill.slippage();

        let pos = self
            .positions
            .entry(fill.symbol().to_string())
            .or_insert_with(|| Position::new(fill.symbol()));

        match fill.side() {
            OrderSide::Buy => {
                let new_qty = pos.quantity + fill.quantity();
                pos.avg_entry_price =
                    (pos.avg_entry_price * pos.quantity + fill.notional()) / new_qty;
                pos.quantity = new_qty;
            }
            OrderSide::Sell => {
                self.realized_pnl += (fill.price() - pos.avg_entry_price) * fill.quantity();
                pos.quantity -= fill.quantity();
                if pos.quantity <= Decimal::ZERO {
                    pos.quantity = Decimal::ZERO;
                    pos.avg_entry_price = Decimal::ZERO;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{FillId, OrderId};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn fill(side: OrderSide, qty: Decimal, price: Decimal) -> Fill {
        Fill::new(
            FillId(1),
            OrderId(1),
            "QQQ",
            side,
            qty,
            price,
            Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn equity_with_no_positions() {
        let portfolio = Portfolio::new(dec!(100000));
        assert_eq!(portfolio.equity(&HashMap::new()), dec!(100000));
    }

    #[test]
    fn buy_then_mark_to_market() {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.apply_fill(&fill(OrderSide::Buy, dec!(100), dec!(100)).with_costs(dec!(1), dec!(0)).unwrap());
        assert_eq!(portfolio.cash, dec!(89999));
        let mut prices = HashMap::new();
        prices.insert("QQQ".to_string(), dec!(110));
        assert_eq!(portfolio.equity(&prices), dec!(100999));
        assert_eq!(portfolio.total_commission, dec!(1));
    }

    #[test]
    fn sell_realizes_pnl_and_flattens() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.apply_fill(&fill(OrderSide::Buy, dec!(10), dec!(100)));
        portfolio.apply_fill(&fill(OrderSide::Sell, dec!(10), dec!(120)));
        assert_eq!(portfolio.realized_pnl, dec!(200));
        assert!(!portfolio.has_position("QQQ"));
        assert_eq!(portfolio.cash, dec!(10200));
    }

    #[test]
    fn weights_are_fractions_of_equity() {
        let mut portfolio = Portfolio::new(dec!(1000));
        portfolio.apply_fill(&fill(OrderSide::Buy, dec!(5), dec!(100)));
        let mut prices = HashMap::new();
        prices.insert("QQQ".to_string(), dec!(100));
        assert_eq!(portfolio.weights(&prices)["QQQ"], dec!(0.5));
    }
}
