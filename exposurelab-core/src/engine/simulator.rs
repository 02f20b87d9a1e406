//! Execution simulator: orders in, fills out.
//!
//! Stateless apart from its configuration. Market orders fill at the bar
//! close. Limit orders fill at their limit when the bar's range reaches it,
//! or at the close when the whole bar is already through the limit. Buys are
//! cut down to what cash can pay for; sells arrive pre-capped at the holding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EngineError;
use crate::domain::{Bar, EventError, Fill, IdGen, Order, OrderKind, OrderSide};

const BPS: Decimal = dec!(10000);

/// Friction applied to every fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Flat commission per share traded.
    pub commission_per_share: Decimal,
    /// Slippage as basis points of notional, always against the trader.
    pub slippage_bps: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::frictionless()
    }
}

impl ExecutionConfig {
    pub fn frictionless() -> Self {
        Self {
            commission_per_share: Decimal::ZERO,
            slippage_bps: Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.commission_per_share < Decimal::ZERO {
            return Err(EngineError::ExecutionCost {
                field: "commission_per_share",
                value: self.commission_per_share,
            });
        }
        if self.slippage_bps < Decimal::ZERO {
            return Err(EngineError::ExecutionCost {
                field: "slippage_bps",
                value: self.slippage_bps,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Price the order against `bar`, or `None` if a limit was not reached.
    pub fn fill_price(&self, order: &Order, bar: &Bar) -> Option<Decimal> {
        match order.kind() {
            OrderKind::Market => Some(bar.close()),
            OrderKind::Limit { limit_price } => {
                let reached = match order.side() {
                    OrderSide::Buy => bar.low() <= limit_price,
                    OrderSide::Sell => bar.high() >= limit_price,
                };
                if !reached {
                    None
                } else if bar.contains(limit_price) {
                    Some(limit_price)
                } else {
                    Some(bar.close())
                }
            }
        }
    }

    /// Slippage dollars for `quantity` at `price`.
    pub fn slippage(&self, quantity: Decimal, price: Decimal) -> Decimal {
        quantity * price * self.config.slippage_bps / BPS
    }

    pub fn commission(&self, quantity: Decimal) -> Decimal {
        quantity * self.config.commission_per_share
    }

    /// Largest whole quantity whose all-in cost fits in `cash`.
    pub fn affordable_quantity(&self, price: Decimal, cash: Decimal) -> Decimal {
        let per_share = price * (Decimal::ONE + self.config.slippage_bps / BPS) + self.config.commission_per_share;
        if per_share <= Decimal::ZERO || cash <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (cash / per_share).floor()
    }

    /// Execute `order` on `bar`. `Ok(None)` means nothing traded: an
    /// unreached limit, or a buy that cash cannot cover.
    pub fn execute(&self, order: &Order, bar: &Bar, cash: Decimal, ids: &mut IdGen) -> Result<Option<Fill>, EventError> {
        let Some(price) = self.fill_price(order, bar) else {
            debug!(order = %order.id(), symbol = order.symbol(), "limit not reached, order dropped");
            return Ok(None);
        };

        let quantity = match order.side() {
            OrderSide::Buy => order.quantity().min(self.affordable_quantity(price, cash)),
            OrderSide::Sell => order.quantity(),
        };
        if quantity <= Decimal::ZERO {
            debug!(order = %order.id(), symbol = order.symbol(), %cash, "insufficient cash, order dropped");
            return Ok(None);
        }
        if quantity < order.quantity() {
            debug!(
                order = %order.id(),
                requested = %order.quantity(),
                filled = %quantity,
                "buy reduced to available cash"
            );
        }

        let fill = Fill::new(
            ids.next_fill_id(),
            order.id(),
            order.symbol(),
            order.side(),
            quantity,
            price,
            bar.timestamp(),
        )?
        .with_costs(self.commission(quantity), self.slippage(quantity, price))?;
        Ok(Some(fill))
    }
}
