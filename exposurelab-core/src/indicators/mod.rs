//! Streaming indicators feeding the exposure pipeline.
//!
//! Each indicator folds one value per bar and never looks ahead: the value
//! after update `t` depends only on inputs `0..=t`.

pub mod kalman;
pub mod realized_vol;
pub mod sma;

pub use kalman::KalmanTrend;
pub use realized_vol::{RealizedVolatility, TRADING_DAYS_PER_YEAR};
pub use sma::Sma;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("{indicator} period must be >= {min}, got {period}")]
    LookbackPeriod {
        indicator: &'static str,
        period: usize,
        min: usize,
    },

    #[error("Kalman noise terms must be in (0, 1e9], got process={process} measurement={measurement}")]
    KalmanNoise { process: Decimal, measurement: Decimal },
}

/// Single-input rolling indicator.
pub trait RollingIndicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50", "rvol_20").
    fn name(&self) -> &str;

    /// Number of updates needed before [`value`](Self::value) is `Some`.
    fn lookback(&self) -> usize;

    /// Fold in the next observation and return the current value.
    fn update(&mut self, input: Decimal) -> Option<Decimal>;

    fn value(&self) -> Option<Decimal>;

    fn is_ready(&self) -> bool {
        self.value().is_some()
    }

    /// Forget all history.
    fn reset(&mut self);
}

/// Feed a whole series through a fresh copy of `indicator`.
pub fn compute_series<I: RollingIndicator + Clone>(indicator: &I, inputs: &[Decimal]) -> Vec<Option<Decimal>> {
    let mut ind = indicator.clone();
    ind.reset();
    inputs.iter().map(|&x| ind.update(x)).collect()
}
