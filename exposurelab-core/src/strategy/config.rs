//! Adaptive-exposure strategy parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exposure::{ExposureConfig, ExposureConfigError};
use crate::indicators::kalman::{noise_in_range, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE};
use crate::indicators::IndicatorError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyConfigError {
    #[error(transparent)]
    Exposure(#[from] ExposureConfigError),

    #[error("symbol {symbol:?} is used for both the {first} and {second} roles")]
    DuplicateSymbol {
        symbol: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("{role} symbol is empty")]
    EmptySymbol { role: &'static str },

    #[error("{indicator} period must be >= {min}, got {period}")]
    LookbackPeriod {
        indicator: &'static str,
        period: usize,
        min: usize,
    },

    #[error("Kalman noise terms must be in (0, 1e9], got process={process} measurement={measurement}")]
    KalmanNoise { process: Decimal, measurement: Decimal },
}

impl From<IndicatorError> for StrategyConfigError {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::LookbackPeriod {
                indicator,
                period,
                min,
            } => Self::LookbackPeriod {
                indicator,
                period,
                min,
            },
            IndicatorError::KalmanNoise {
                process,
                measurement,
            } => Self::KalmanNoise {
                process,
                measurement,
            },
        }
    }
}

/// Everything needed to build an [`AdaptiveExposureStrategy`](super::AdaptiveExposureStrategy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptiveConfig {
    /// Trend and volatility source.
    pub signal_symbol: String,
    /// 1x instrument.
    pub core_symbol: String,
    /// 3x instrument.
    pub leveraged_symbol: String,
    /// Volatility index. Without one the VIX tier is neutral.
    pub vix_symbol: Option<String>,
    pub kalman_process_noise: Decimal,
    pub kalman_measurement_noise: Decimal,
    pub kalman_settle_bars: usize,
    /// Number of returns in the realized-volatility window.
    pub vol_lookback: usize,
    pub exposure: ExposureConfig,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            signal_symbol: "SPY".into(),
            core_symbol: "SPY".into(),
            leveraged_symbol: "UPRO".into(),
            vix_symbol: Some("VIX".into()),
            kalman_process_noise: DEFAULT_PROCESS_NOISE,
            kalman_measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            kalman_settle_bars: 20,
            vol_lookback: 20,
            exposure: ExposureConfig::default(),
        }
    }
}

impl AdaptiveConfig {
    /// Primary bars needed before every indicator is ready.
    pub fn warmup_bars(&self) -> usize {
        let vix = if self.vix_symbol.is_some() {
            self.exposure.vix_period
        } else {
            0
        };
        self.kalman_settle_bars.max(self.vol_lookback + 1).max(vix)
    }

    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        self.exposure.validate()?;

        let mut roles: Vec<(&'static str, &str)> = vec![
            ("signal", self.signal_symbol.as_str()),
            ("core", self.core_symbol.as_str()),
            ("leveraged", self.leveraged_symbol.as_str()),
        ];
        if let Some(vix) = &self.vix_symbol {
            roles.push(("volatility index", vix.as_str()));
        }
        for &(role, symbol) in &roles {
            if symbol.trim().is_empty() {
                return Err(StrategyConfigError::EmptySymbol { role });
            }
        }
        // the signal symbol may double as the core instrument
        for (i, &(first, a)) in roles.iter().enumerate() {
            for &(second, b) in roles.iter().skip(i + 1) {
                let allowed = first == "signal" && second == "core";
                if a == b && !allowed {
                    return Err(StrategyConfigError::DuplicateSymbol {
                        symbol: a.to_string(),
                        first,
                        second,
                    });
                }
            }
        }

        if !noise_in_range(self.kalman_process_noise) || !noise_in_range(self.kalman_measurement_noise) {
            return Err(StrategyConfigError::KalmanNoise {
                process: self.kalman_process_noise,
                measurement: self.kalman_measurement_noise,
            });
        }
        if self.kalman_settle_bars < 2 {
            return Err(StrategyConfigError::LookbackPeriod {
                indicator: "kalman trend",
                period: self.kalman_settle_bars,
                min: 2,
            });
        }
        if self.vol_lookback < 2 {
            return Err(StrategyConfigError::LookbackPeriod {
                indicator: "realized volatility",
                period: self.vol_lookback,
                min: 2,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_is_valid() {
        let config = AdaptiveConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.warmup_bars(), 50);
    }

    #[test]
    fn warmup_without_vix() {
        let config = AdaptiveConfig {
            vix_symbol: None,
            ..Default::default()
        };
        assert_eq!(config.warmup_bars(), 21);
    }

    #[test]
    fn core_and_leveraged_must_differ() {
        let config = AdaptiveConfig {
            leveraged_symbol: "SPY".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StrategyConfigError::DuplicateSymbol { first: "signal", second: "leveraged", .. })
        ));
    }

    #[test]
    fn vix_must_not_be_an_instrument() {
        let config = AdaptiveConfig {
            vix_symbol: Some("UPRO".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StrategyConfigError::DuplicateSymbol { .. })
        ));
    }

    #[test]
    fn exposure_errors_pass_through() {
        let mut config = AdaptiveConfig::default();
        config.exposure.vix_period = 0;
        assert_eq!(
            config.validate(),
            Err(StrategyConfigError::Exposure(ExposureConfigError::VixPeriod(0)))
        );
    }

    #[test]
    fn indicator_parameters_checked() {
        let config = AdaptiveConfig {
            kalman_process_noise: dec!(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StrategyConfigError::KalmanNoise { .. })));

        let config = AdaptiveConfig {
            kalman_process_noise: crate::indicators::kalman::MAX_NOISE * dec!(10),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StrategyConfigError::KalmanNoise { .. })));

        let config = AdaptiveConfig {
            vol_lookback: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StrategyConfigError::LookbackPeriod { min: 2, .. })
        ));
    }

    #[test]
    fn unknown_keys_rejected() {
        let json = r#"{"signal_symbol": "SPY", "kalman_window": 10}"#;
        assert!(serde_json::from_str::<AdaptiveConfig>(json).is_err());
    }
}
