//! Reference strategy: buy once after warmup, hold to the end.

use rust_decimal::Decimal;
use tracing::warn;

use super::{PortfolioView, Strategy};
use crate::domain::{Bar, Signal, SignalDirection};

#[derive(Debug, Clone)]
pub struct BuyAndHoldStrategy {
    symbol: String,
    warmup_bars: usize,
    seen: usize,
    invested: bool,
}

impl BuyAndHoldStrategy {
    pub fn new(symbol: impl Into<String>, warmup_bars: usize) -> Self {
        Self {
            symbol: symbol.into(),
            warmup_bars,
            seen: 0,
            invested: false,
        }
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn primary_symbol(&self) -> &str {
        &self.symbol
    }

    fn warmup_bars(&self) -> usize {
        self.warmup_bars
    }

    fn tracked_symbols(&self) -> Vec<String> {
        vec![self.symbol.clone()]
    }

    fn on_bar(&mut self, bar: &Bar, view: &PortfolioView<'_>) -> Vec<Signal> {
        if bar.symbol() != self.symbol {
            return Vec::new();
        }
        self.seen += 1;
        if self.invested || self.seen <= self.warmup_bars {
            return Vec::new();
        }
        self.invested = true;
        let quantity = (view.cash() / bar.close()).floor();
        if quantity <= Decimal::ZERO {
            return Vec::new();
        }
        match Signal::new(&self.symbol, SignalDirection::Buy, bar.timestamp(), quantity) {
            Ok(signal) => vec![signal.with_strategy(self.name())],
            Err(err) => {
                warn!(%err, "buy-and-hold signal rejected");
                Vec::new()
            }
        }
    }

    fn reset(&mut self) {
        self.seen = 0;
        self.invested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn bar(symbol: &str, i: i64, close: Decimal) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap() + Duration::days(i);
        Bar::new(symbol, ts, close, close, close, close, dec!(0)).unwrap()
    }

    #[test]
    fn buys_once_after_warmup() {
        let mut strategy = BuyAndHoldStrategy::new("SPY", 2);
        let positions = HashMap::new();
        let prices = HashMap::new();
        let view = PortfolioView::new(dec!(10000), dec!(10000), &positions, &prices);

        assert!(strategy.on_bar(&bar("SPY", 0, dec!(99)), &view).is_empty());
        assert!(strategy.on_bar(&bar("SPY", 1, dec!(99)), &view).is_empty());
        let signals = strategy.on_bar(&bar("SPY", 2, dec!(300)), &view);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].quantity(), dec!(33));
        assert_eq!(signals[0].strategy_id(), "buy_and_hold");
        assert!(strategy.on_bar(&bar("SPY", 3, dec!(300)), &view).is_empty());
    }

    #[test]
    fn ignores_other_symbols() {
        let mut strategy = BuyAndHoldStrategy::new("SPY", 0);
        let positions = HashMap::new();
        let prices = HashMap::new();
        let view = PortfolioView::new(dec!(10000), dec!(10000), &positions, &prices);
        assert!(strategy.on_bar(&bar("QQQ", 0, dec!(100)), &view).is_empty());
        assert_eq!(strategy.on_bar(&bar("SPY", 0, dec!(100)), &view).len(), 1);
    }
}
