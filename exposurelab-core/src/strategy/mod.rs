//! Strategy trait and the read-only portfolio view strategies decide against.
//!
//! A strategy owns its indicator and drawdown state exclusively. The event
//! loop feeds it every bar in timestamp order and converts the signals it
//! returns into orders; the strategy never touches the portfolio directly.

pub mod adaptive;
pub mod buy_and_hold;
pub mod config;

pub use adaptive::AdaptiveExposureStrategy;
pub use buy_and_hold::BuyAndHoldStrategy;
pub use config::{AdaptiveConfig, StrategyConfigError};

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::{Bar, Position, Signal};
use crate::exposure::ExposureBreakdown;

/// Bar-driven signal source.
pub trait Strategy: Send {
    /// Identifier stamped on every emitted signal.
    fn name(&self) -> &str;

    /// Symbol whose bars drive decisions and count toward warmup.
    fn primary_symbol(&self) -> &str;

    /// Primary-symbol bars consumed before the first signal may be emitted.
    fn warmup_bars(&self) -> usize;

    /// Every symbol the strategy reads. Bars for other symbols are ignored.
    fn tracked_symbols(&self) -> Vec<String>;

    /// Process one bar. Returns at most one signal per instrument.
    fn on_bar(&mut self, bar: &Bar, view: &PortfolioView<'_>) -> Vec<Signal>;

    /// Drop all per-run state.
    fn reset(&mut self);

    /// Tier values behind the latest decision, for strategies that have them.
    fn exposure_breakdown(&self) -> Option<ExposureBreakdown> {
        None
    }
}

/// Snapshot of portfolio state marked at the latest known closes.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioView<'a> {
    cash: Decimal,
    equity: Decimal,
    positions: &'a HashMap<String, Position>,
    prices: &'a HashMap<String, Decimal>,
}

impl<'a> PortfolioView<'a> {
    pub fn new(
        cash: Decimal,
        equity: Decimal,
        positions: &'a HashMap<String, Position>,
        prices: &'a HashMap<String, Decimal>,
    ) -> Self {
        Self {
            cash,
            equity,
            positions,
            prices,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn equity(&self) -> Decimal {
        self.equity
    }

    pub fn quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Latest close seen for `symbol`.
    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    /// Market value of the holding as a fraction of equity.
    pub fn weight(&self, symbol: &str) -> Decimal {
        if self.equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self.price(symbol) {
            Some(price) => self.quantity(symbol) * price / self.equity,
            None => Decimal::ZERO,
        }
    }
}
