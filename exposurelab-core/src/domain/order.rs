//! Orders produced from signals and consumed by the execution simulator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::EventError;
use super::ids::OrderId;
use super::signal::{Signal, SignalDirection};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> Decimal {
        match self {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

/// How the order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Fill at the bar close.
    Market,
    /// Fill at `limit_price` if the bar trades through it.
    Limit { limit_price: Decimal },
}

/// A validated order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: String,
    kind: OrderKind,
    side: OrderSide,
    quantity: Decimal,
    timestamp: DateTime<Utc>,
}

impl Order {
    pub fn market(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        Self::build(id, symbol.into(), OrderKind::Market, side, quantity, timestamp)
    }

    /// Limit orders must carry a positive limit price.
    pub fn limit(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        let symbol = symbol.into();
        match limit_price {
            Some(price) if price > Decimal::ZERO => Self::build(
                id,
                symbol,
                OrderKind::Limit { limit_price: price },
                side,
                quantity,
                timestamp,
            ),
            _ => Err(EventError::MissingLimitPrice { symbol }),
        }
    }

    /// Turn a signal into an order.
    ///
    /// `held` is the quantity currently held in the signal's symbol; it sizes
    /// flat signals and caps sells. Returns `Ok(None)` when nothing is left to
    /// trade (a flat or sell signal with no holding).
    pub fn from_signal(
        id: OrderId,
        signal: &Signal,
        held: Decimal,
    ) -> Result<Option<Self>, EventError> {
        let (side, quantity) = match signal.direction() {
            SignalDirection::Buy => (OrderSide::Buy, signal.quantity()),
            SignalDirection::Sell => (OrderSide::Sell, signal.quantity().min(held)),
            SignalDirection::Flat => (OrderSide::Sell, held),
        };
        if quantity <= Decimal::ZERO {
            return Ok(None);
        }
        let order = match signal.price() {
            Some(price) => Self::limit(
                id,
                signal.symbol(),
                side,
                quantity,
                Some(price),
                signal.timestamp(),
            )?,
            None => Self::market(id, signal.symbol(), side, quantity, signal.timestamp())?,
        };
        Ok(Some(order))
    }

    fn build(
        id: OrderId,
        symbol: String,
        kind: OrderKind,
        side: OrderSide,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        if symbol.trim().is_empty() {
            return Err(EventError::EmptySymbol);
        }
        if quantity <= Decimal::ZERO {
            return Err(EventError::NonPositiveQuantity { symbol, quantity });
        }
        Ok(Self {
            id,
            symbol,
            kind,
            side,
            quantity,
            timestamp,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        match self.kind {
            OrderKind::Market => None,
            OrderKind::Limit { limit_price } => Some(limit_price),
        }
    }
}
