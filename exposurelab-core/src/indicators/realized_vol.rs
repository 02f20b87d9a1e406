//! Realized volatility.
//!
//! Sample standard deviation of simple close-to-close returns over the last
//! `period` returns, annualized by sqrt(252). Needs `period + 1` closes.

use std::collections::VecDeque;

use rust_decimal::{Decimal, MathematicalOps};

use super::{IndicatorError, RollingIndicator};

pub const TRADING_DAYS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone)]
pub struct RealizedVolatility {
    period: usize,
    name: String,
    prev_close: Option<Decimal>,
    returns: VecDeque<Decimal>,
}

impl RealizedVolatility {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period < 2 {
            return Err(IndicatorError::LookbackPeriod {
                indicator: "realized volatility",
                period,
                min: 2,
            });
        }
        Ok(Self {
            period,
            name: format!("rvol_{period}"),
            prev_close: None,
            returns: VecDeque::with_capacity(period),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl RollingIndicator for RealizedVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, close: Decimal) -> Option<Decimal> {
        if let Some(prev) = self.prev_close {
            if prev > Decimal::ZERO {
                self.returns.push_back((close - prev) / prev);
                if self.returns.len() > self.period {
                    self.returns.pop_front();
                }
            }
        }
        self.prev_close = Some(close);
        self.value()
    }

    fn value(&self) -> Option<Decimal> {
        if self.returns.len() < self.period {
            return None;
        }
        let n = Decimal::from(self.period);
        let mean = self.returns.iter().sum::<Decimal>() / n;
        let ss: Decimal = self.returns.iter().map(|r| (r - mean) * (r - mean)).sum();
        let variance = ss / (n - Decimal::ONE);
        let annualized = variance * Decimal::from(TRADING_DAYS_PER_YEAR);
        annualized.sqrt()
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.returns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn constant_prices_have_zero_vol() {
        let mut rv = RealizedVolatility::new(3).unwrap();
        for _ in 0..3 {
            assert_eq!(rv.update(dec!(100)), None);
        }
        assert_eq!(rv.update(dec!(100)), Some(dec!(0)));
    }

    #[test]
    fn alternating_returns() {
        // returns +10%, -10%: mean 0, sample variance 0.02
        let mut rv = RealizedVolatility::new(2).unwrap();
        rv.update(dec!(100));
        rv.update(dec!(110));
        let vol = rv.update(dec!(99)).unwrap();
        let expected = (dec!(0.02) * dec!(252)).sqrt().unwrap();
        assert_eq!(vol, expected);
        assert!(vol > dec!(2.24) && vol < dec!(2.25));
    }

    #[test]
    fn window_rolls() {
        let mut rv = RealizedVolatility::new(2).unwrap();
        rv.update(dec!(100));
        rv.update(dec!(110));
        rv.update(dec!(99));
        // last two returns are -10% and 0%
        rv.update(dec!(99));
        let expected = (dec!(0.005) * dec!(252)).sqrt().unwrap();
        assert_eq!(rv.value(), Some(expected));
    }

    #[test]
    fn lookback_counts_closes() {
        assert_eq!(RealizedVolatility::new(20).unwrap().lookback(), 21);
        assert!(RealizedVolatility::new(1).is_err());
    }
}
