//! Constant-velocity Kalman trend filter.
//!
//! Two-state model over closes: `level` and `velocity` (price change per
//! bar). Trend strength is the velocity relative to the level, in basis
//! points per bar.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{IndicatorError, RollingIndicator};

const BPS: Decimal = dec!(10000);

/// Defaults tuned for daily equity index closes.
pub const DEFAULT_PROCESS_NOISE: Decimal = dec!(0.01);
pub const DEFAULT_MEASUREMENT_NOISE: Decimal = dec!(1);

/// Upper bound on either noise term; keeps the covariance recursion finite.
pub const MAX_NOISE: Decimal = dec!(1000000000);

/// Both noise terms must lie in `(0, MAX_NOISE]`.
pub fn noise_in_range(noise: Decimal) -> bool {
    noise > Decimal::ZERO && noise <= MAX_NOISE
}

#[derive(Debug, Clone)]
pub struct KalmanTrend {
    process_noise: Decimal,
    measurement_noise: Decimal,
    settle_bars: usize,
    name: String,
    level: Decimal,
    velocity: Decimal,
    // covariance [[p00, p01], [p01, p11]]
    p00: Decimal,
    p01: Decimal,
    p11: Decimal,
    seen: usize,
}

impl KalmanTrend {
    pub fn new(process_noise: Decimal, measurement_noise: Decimal, settle_bars: usize) -> Result<Self, IndicatorError> {
        if !noise_in_range(process_noise) || !noise_in_range(measurement_noise) {
            return Err(IndicatorError::KalmanNoise {
                process: process_noise,
                measurement: measurement_noise,
            });
        }
        if settle_bars < 2 {
            return Err(IndicatorError::LookbackPeriod {
                indicator: "kalman trend",
                period: settle_bars,
                min: 2,
            });
        }
        Ok(Self {
            process_noise,
            measurement_noise,
            settle_bars,
            name: format!("kalman_{settle_bars}"),
            level: Decimal::ZERO,
            velocity: Decimal::ZERO,
            p00: Decimal::ZERO,
            p01: Decimal::ZERO,
            p11: Decimal::ZERO,
            seen: 0,
        })
    }

    pub fn level(&self) -> Decimal {
        self.level
    }

    pub fn velocity(&self) -> Decimal {
        self.velocity
    }

    fn trend_strength(&self) -> Decimal {
        if self.level <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        // a near-zero level saturates rather than overflowing
        BPS.checked_mul(self.velocity)
            .and_then(|v| v.checked_div(self.level))
            .unwrap_or(if self.velocity.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            })
    }
}

impl RollingIndicator for KalmanTrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.settle_bars
    }

    fn update(&mut self, close: Decimal) -> Option<Decimal> {
        self.seen += 1;
        if self.seen == 1 {
            self.level = close;
            self.velocity = Decimal::ZERO;
            self.p00 = self.measurement_noise;
            self.p01 = Decimal::ZERO;
            self.p11 = self.measurement_noise;
            return self.value();
        }

        // predict: x = F x, P = F P F' + Q with F = [[1, 1], [0, 1]]
        let level = self.level + self.velocity;
        let p00 = self.p00 + dec!(2) * self.p01 + self.p11 + self.process_noise;
        let p01 = self.p01 + self.p11;
        let p11 = self.p11 + self.process_noise;

        // update against the observed close
        let innovation = close - level;
        let s = p00 + self.measurement_noise;
        let k0 = p00 / s;
        let k1 = p01 / s;

        self.level = level + k0 * innovation;
        self.velocity += k1 * innovation;
        self.p00 = (Decimal::ONE - k0) * p00;
        self.p01 = (Decimal::ONE - k0) * p01;
        self.p11 = p11 - k1 * p01;

        self.value()
    }

    fn value(&self) -> Option<Decimal> {
        if self.seen < self.settle_bars {
            return None;
        }
        Some(self.trend_strength())
    }

    fn reset(&mut self) {
        self.level = Decimal::ZERO;
        self.velocity = Decimal::ZERO;
        self.p00 = Decimal::ZERO;
        self.p01 = Decimal::ZERO;
        self.p11 = Decimal::ZERO;
        self.seen = 0;
    }
}
