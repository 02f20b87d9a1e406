//! Strategy signals — the intent to trade emitted on a bar.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::EventError;

/// Strategy id used when a signal does not name its origin.
pub const UNKNOWN_STRATEGY: &str = "unknown";

/// What the signal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Buy,
    Sell,
    /// Close whatever is held in the symbol.
    Flat,
}

/// A trade intent for one symbol at one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    symbol: String,
    direction: SignalDirection,
    timestamp: DateTime<Utc>,
    quantity: Decimal,
    strategy_id: String,
    price: Option<Decimal>,
}

impl Signal {
    /// Build a signal. `quantity` must be positive for buys and sells;
    /// flat signals may carry zero.
    pub fn new(
        symbol: impl Into<String>,
        direction: SignalDirection,
        timestamp: DateTime<Utc>,
        quantity: Decimal,
    ) -> Result<Self, EventError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(EventError::EmptySymbol);
        }
        let quantity_ok = match direction {
            SignalDirection::Flat => quantity >= Decimal::ZERO,
            SignalDirection::Buy | SignalDirection::Sell => quantity > Decimal::ZERO,
        };
        if !quantity_ok {
            return Err(EventError::NonPositiveQuantity { symbol, quantity });
        }
        Ok(Self {
            symbol,
            direction,
            timestamp,
            quantity,
            strategy_id: UNKNOWN_STRATEGY.to_string(),
            price: None,
        })
    }

    pub fn with_strategy(mut self, strategy_id: impl Into<String>) -> Self {
        let id = strategy_id.into();
        if !id.trim().is_empty() {
            self.strategy_id = id;
        }
        self
    }

    /// Attach a reference price. The execution step turns priced signals
    /// into limit orders.
    pub fn with_price(mut self, price: Decimal) -> Result<Self, EventError> {
        if price <= Decimal::ZERO {
            return Err(EventError::NonPositivePrice {
                symbol: self.symbol,
                price,
            });
        }
        self.price = Some(price);
        Ok(self)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn direction(&self) -> SignalDirection {
        self.direction
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }
}
