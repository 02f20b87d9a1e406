//! The five-tier signal-to-exposure transform.
//!
//! ```text
//! trend ──► T_norm ──► E_trend ──► E_vol ──► E_volVIX ──► E_raw ──► E_t
//!           tier 1     tier 2      tier 3    tier 4       tier 5    clip
//! ```
//!
//! Tiers 3 to 5 scale the deviation from neutral (1.0), never the absolute
//! exposure. Every step is a pure function of its inputs.

use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::{ExposureConfig, ExposureConfigError};
use super::governor::drawdown_compression;

/// Per-bar market state fed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureInputs {
    /// Raw trend-strength estimate (e.g. Kalman velocity in bps of level).
    pub trend_strength: Decimal,
    /// Annualized realized volatility; zero means "unknown" and scales neutrally.
    pub realized_vol: Decimal,
    /// Volatility index divided by its moving average.
    pub vix_ratio: Decimal,
    /// Current drawdown from the equity peak, as a fraction.
    pub drawdown: Decimal,
}

/// Every intermediate value of one pipeline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureBreakdown {
    pub inputs: ExposureInputs,
    pub t_norm: Decimal,
    pub e_trend: Decimal,
    pub s_vol: Decimal,
    pub e_vol: Decimal,
    pub p_vix: Decimal,
    pub e_volvix: Decimal,
    pub p_dd: Decimal,
    pub e_raw: Decimal,
    pub exposure: Decimal,
}

// ─── Tier functions ─────────────────────────────────────────────────

/// Tier 1: `clip(trend_strength / t_max, -1, 1)`. Requires `t_max > 0`.
///
/// A quotient too large to represent saturates at the sign of the input.
pub fn normalize_trend(trend_strength: Decimal, t_max: Decimal) -> Decimal {
    trend_strength
        .checked_div(t_max)
        .unwrap_or_else(|| trend_strength.signum())
        .clamp(Decimal::NEGATIVE_ONE, Decimal::ONE)
}

/// Tier 2: `1 + k_trend * T_norm`.
pub fn trend_exposure(t_norm: Decimal, k_trend: Decimal) -> Decimal {
    Decimal::ONE + k_trend * t_norm
}

/// Tier 3 factor: `clip(sigma_target / sigma_real, min, max)`.
///
/// Non-positive realized volatility yields exactly 1 (no scaling).
pub fn vol_scaler(sigma_target: Decimal, sigma_real: Decimal, min: Decimal, max: Decimal) -> Decimal {
    if sigma_real <= Decimal::ZERO {
        return Decimal::ONE;
    }
    sigma_target.checked_div(sigma_real).unwrap_or(max).clamp(min, max)
}

/// Tier 4 factor: 1 while the index is at or below its average, then
/// `1 / (1 + alpha * (R - 1))`.
pub fn vix_compression(vix_ratio: Decimal, alpha: Decimal) -> Decimal {
    if vix_ratio <= Decimal::ONE {
        return Decimal::ONE;
    }
    alpha
        .checked_mul(vix_ratio - Decimal::ONE)
        .and_then(|excess| Decimal::ONE.checked_add(excess))
        .and_then(|denom| Decimal::ONE.checked_div(denom))
        .unwrap_or(Decimal::ZERO)
}

/// `1 + (exposure - 1) * factor`: shrink or stretch the distance from neutral.
pub fn scale_deviation(exposure: Decimal, factor: Decimal) -> Decimal {
    Decimal::ONE + (exposure - Decimal::ONE) * factor
}

/// Final tier: clip into `[e_min, e_max]`.
pub fn clip_exposure(exposure: Decimal, e_min: Decimal, e_max: Decimal) -> Decimal {
    exposure.clamp(e_min, e_max)
}

// ─── Pipeline ───────────────────────────────────────────────────────

/// A validated tier chain.
#[derive(Debug, Clone)]
pub struct ExposurePipeline {
    config: ExposureConfig,
}

impl ExposurePipeline {
    pub fn new(config: ExposureConfig) -> Result<Self, ExposureConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExposureConfig {
        &self.config
    }

    /// Run all tiers for one bar.
    pub fn evaluate(&self, inputs: ExposureInputs) -> ExposureBreakdown {
        let c = &self.config;

        let t_norm = normalize_trend(inputs.trend_strength, c.t_max);
        let e_trend = trend_exposure(t_norm, c.k_trend);

        let s_vol = vol_scaler(c.sigma_target, inputs.realized_vol, c.s_vol_min, c.s_vol_max);
        let e_vol = scale_deviation(e_trend, s_vol);

        let p_vix = vix_compression(inputs.vix_ratio, c.alpha_vix);
        let e_volvix = scale_deviation(e_vol, p_vix);

        let p_dd = drawdown_compression(inputs.drawdown, c.dd_soft, c.dd_hard, c.p_min);
        let e_raw = c.governor.apply(e_volvix, p_dd);

        let exposure = clip_exposure(e_raw, c.e_min, c.e_max);

        ExposureBreakdown {
            inputs,
            t_norm,
            e_trend,
            s_vol,
            e_vol,
            p_vix,
            e_volvix,
            p_dd,
            e_raw,
            exposure,
        }
    }
}
