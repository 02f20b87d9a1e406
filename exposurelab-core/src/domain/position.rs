use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Long holding in one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn market_value(&self, current_price: Decimal) -> Decimal {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        self.quantity * (current_price - self.avg_entry_price)
    }
}
