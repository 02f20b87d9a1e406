//! Exposure pipeline parameters and their construction-time validation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::governor::GovernorPolicy;

/// Highest exposure reachable with the core + 3x leveraged pair.
pub const MAX_REACHABLE_EXPOSURE: Decimal = dec!(3);

/// Which constraint a parameter set violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExposureConfigError {
    #[error("exposure bounds invalid: require 0 <= e_min < e_max <= {max}, got e_min={e_min} e_max={e_max}")]
    ExposureBounds {
        e_min: Decimal,
        e_max: Decimal,
        max: Decimal,
    },

    #[error("vol-scaler bounds invalid: require 0 <= s_vol_min < s_vol_max, got {min}..{max}")]
    VolScalerBounds { min: Decimal, max: Decimal },

    #[error("drawdown thresholds invalid: require 0 <= dd_soft < dd_hard, got soft={soft} hard={hard}")]
    DrawdownThresholds { soft: Decimal, hard: Decimal },

    #[error("VIX averaging period must be >= 1, got {0}")]
    VixPeriod(usize),

    #[error("rebalance threshold must be >= 0, got {0}")]
    RebalanceThreshold(Decimal),

    #[error("trend scale t_max must be > 0, got {0}")]
    TrendScale(Decimal),

    #[error("volatility target must be > 0, got {0}")]
    VolTarget(Decimal),

    #[error("VIX sensitivity alpha must be >= 0, got {0}")]
    VixSensitivity(Decimal),

    #[error("minimum drawdown compression p_min must be in [0, 1], got {0}")]
    MinimumCompression(Decimal),

    #[error("asymmetric governor floor must be in [0, 1], got {0}")]
    GovernorFloor(Decimal),
}

/// Tier parameters. Validate with [`ExposureConfig::validate`] or build an
/// [`ExposurePipeline`](super::ExposurePipeline), which validates for you.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExposureConfig {
    /// Trend strength that saturates `T_norm` at +/-1.
    pub t_max: Decimal,
    /// Slope of the baseline exposure in `T_norm`.
    pub k_trend: Decimal,
    /// Annualized volatility the scaler aims for.
    pub sigma_target: Decimal,
    pub s_vol_min: Decimal,
    pub s_vol_max: Decimal,
    /// Compression strength once the VIX ratio exceeds 1.
    pub alpha_vix: Decimal,
    /// Moving-average length for the VIX ratio denominator.
    pub vix_period: usize,
    pub dd_soft: Decimal,
    pub dd_hard: Decimal,
    /// Drawdown compression applied at and beyond `dd_hard`.
    pub p_min: Decimal,
    pub e_min: Decimal,
    pub e_max: Decimal,
    /// L1 weight distance that must be exceeded before rebalancing.
    pub rebalance_threshold: Decimal,
    pub governor: GovernorPolicy,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            t_max: dec!(50),
            k_trend: dec!(0.3),
            sigma_target: dec!(0.20),
            s_vol_min: dec!(0.5),
            s_vol_max: dec!(1.5),
            alpha_vix: dec!(1.0),
            vix_period: 50,
            dd_soft: dec!(0.10),
            dd_hard: dec!(0.20),
            p_min: dec!(0),
            e_min: dec!(0),
            e_max: dec!(1.5),
            rebalance_threshold: dec!(0.025),
            governor: GovernorPolicy::Symmetric,
        }
    }
}

impl ExposureConfig {
    /// Check every constraint, reporting the first one violated.
    pub fn validate(&self) -> Result<(), ExposureConfigError> {
        let zero = Decimal::ZERO;

        if self.e_min < zero || self.e_min >= self.e_max || self.e_max > MAX_REACHABLE_EXPOSURE {
            return Err(ExposureConfigError::ExposureBounds {
                e_min: self.e_min,
                e_max: self.e_max,
                max: MAX_REACHABLE_EXPOSURE,
            });
        }
        if self.s_vol_min < zero || self.s_vol_min >= self.s_vol_max {
            return Err(ExposureConfigError::VolScalerBounds {
                min: self.s_vol_min,
                max: self.s_vol_max,
            });
        }
        if self.dd_soft < zero || self.dd_soft >= self.dd_hard {
            return Err(ExposureConfigError::DrawdownThresholds {
                soft: self.dd_soft,
                hard: self.dd_hard,
            });
        }
        if self.vix_period < 1 {
            return Err(ExposureConfigError::VixPeriod(self.vix_period));
        }
        if self.rebalance_threshold < zero {
            return Err(ExposureConfigError::RebalanceThreshold(self.rebalance_threshold));
        }
        if self.t_max <= zero {
            return Err(ExposureConfigError::TrendScale(self.t_max));
        }
        if self.sigma_target <= zero {
            return Err(ExposureConfigError::VolTarget(self.sigma_target));
        }
        if self.alpha_vix < zero {
            return Err(ExposureConfigError::VixSensitivity(self.alpha_vix));
        }
        if self.p_min < zero || self.p_min > Decimal::ONE {
            return Err(ExposureConfigError::MinimumCompression(self.p_min));
        }
        if let GovernorPolicy::Asymmetric { floor } = self.governor {
            if floor < zero || floor > Decimal::ONE {
                return Err(ExposureConfigError::GovernorFloor(floor));
            }
        }
        Ok(())
    }
}
