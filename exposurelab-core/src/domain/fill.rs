//! Fills — terminal execution records appended to the trade ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::EventError;
use super::ids::{FillId, OrderId};
use super::order::OrderSide;

/// An executed trade.
///
/// `commission` and `slippage` are dollar amounts charged on top of
/// `quantity * price`; both default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    id: FillId,
    order_id: OrderId,
    symbol: String,
    side: OrderSide,
    quantity: Decimal,
    price: Decimal,
    timestamp: DateTime<Utc>,
    commission: Decimal,
    slippage: Decimal,
}

impl Fill {
    pub fn new(
        id: FillId,
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(EventError::EmptySymbol);
        }
        if quantity <= Decimal::ZERO {
            return Err(EventError::NonPositiveQuantity { symbol, quantity });
        }
        if price <= Decimal::ZERO {
            return Err(EventError::NonPositivePrice { symbol, price });
        }
        Ok(Self {
            id,
            order_id,
            symbol,
            side,
            quantity,
            price,
            timestamp,
            commission: Decimal::ZERO,
            slippage: Decimal::ZERO,
        })
    }

    /// Attach execution costs. Negative amounts are rejected.
    pub fn with_costs(mut self, commission: Decimal, slippage: Decimal) -> Result<Self, EventError> {
        for (field, value) in [("commission", commission), ("slippage", slippage)] {
            if value < Decimal::ZERO {
                return Err(EventError::NegativeCost {
                    symbol: self.symbol,
                    field,
                    value,
                });
            }
        }
        self.commission = commission;
        self.slippage = slippage;
        Ok(self)
    }

    pub fn id(&self) -> FillId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn commission(&self) -> Decimal {
        self.commission
    }

    pub fn slippage(&self) -> Decimal {
        self.slippage
    }

    /// Gross traded value, `quantity * price`.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }

    /// Cash paid for a buy (notional plus costs) or received for a sell
    /// (notional minus costs).
    pub fn total_cost(&self) -> Decimal {
        let costs = self.commission + self.slippage;
        match self.side {
            OrderSide::Buy => self.notional() + costs,
            OrderSide::Sell => self.notional() - costs,
        }
    }

    /// Signed change in cash caused by this fill.
    pub fn cash_delta(&self) -> Decimal {
        match self.side {
            OrderSide::Buy => -self.total_cost(),
            OrderSide::Sell => self.total_cost(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fill(side: OrderSide) -> Fill {
        Fill::new(
            FillId(1),
            OrderId(1),
            "QQQ",
            side,
            dec!(3),
            dec!(0.1),
            Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn costs_default_to_zero() {
        let f = fill(OrderSide::Buy);
        assert_eq!(f.commission(), Decimal::ZERO);
        assert_eq!(f.slippage(), Decimal::ZERO);
        assert_eq!(f.total_cost(), dec!(0.3));
    }

    #[test]
    fn buy_total_cost_adds_costs_exactly() {
        // 3 * 0.1 is 0.30000000000000004 in binary floating point.
        let f = fill(OrderSide::Buy).with_costs(dec!(0.1), dec!(0.2)).unwrap();
        assert_eq!(f.total_cost(), dec!(0.6));
        assert_eq!(f.cash_delta(), dec!(-0.6));
    }

    #[test]
    fn sell_total_cost_subtracts_costs() {
        let f = fill(OrderSide::Sell).with_costs(dec!(0.1), dec!(0.05)).unwrap();
        assert_eq!(f.total_cost(), dec!(0.15));
        assert_eq!(f.cash_delta(), dec!(0.15));
    }

    #[test]
    fn negative_commission_is_rejected() {
        let err = fill(OrderSide::Buy).with_costs(dec!(-1), dec!(0)).unwrap_err();
        assert!(matches!(err, EventError::NegativeCost { field: "commission", .. }));
    }
}
