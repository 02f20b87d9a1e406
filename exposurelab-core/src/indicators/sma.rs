//! Simple Moving Average (SMA).
//!
//! Rolling mean over the last `period` inputs. Used for the volatility-index
//! moving average.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use super::{IndicatorError, RollingIndicator};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: VecDeque<Decimal>,
    sum: Decimal,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period < 1 {
            return Err(IndicatorError::LookbackPeriod {
                indicator: "sma",
                period,
                min: 1,
            });
        }
        Ok(Self {
            period,
            name: format!("sma_{period}"),
            window: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl RollingIndicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, input: Decimal) -> Option<Decimal> {
        self.window.push_back(input);
        self.sum += input;
        if self.window.len() > self.period {
            if let Some(leaving) = self.window.pop_front() {
                self.sum -= leaving;
            }
        }
        self.value()
    }

    fn value(&self) -> Option<Decimal> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / Decimal::from(self.period))
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = Decimal::ZERO;
    }
}
