//! TOML configuration for a backtest and the batch modes built on it.
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000
//! data_files = ["data/spy.csv", "data/upro.csv", "data/vix.csv"]
//!
//! [strategy]
//! signal_symbol = "SPY"
//! core_symbol = "SPY"
//! leveraged_symbol = "UPRO"
//! vix_symbol = "VIX"
//!
//! [exposure]
//! k_trend = 0.3
//! governor = { type = "asymmetric", floor = 0.5 }
//!
//! [execution]
//! commission_per_share = 0.005
//! slippage_bps = 5
//! ```
//!
//! Every table and key is optional; unknown keys are rejected. Dates are
//! quoted `YYYY-MM-DD` strings.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use exposurelab_core::engine::{EngineConfig, EngineError, ExecutionConfig};
use exposurelab_core::exposure::ExposureConfig;
use exposurelab_core::indicators::kalman::{DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE};
use exposurelab_core::strategy::{AdaptiveConfig, StrategyConfigError};

use crate::grid_search::ParamGrid;
use crate::walk_forward::WalkForwardConfig;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] StrategyConfigError),

    #[error("invalid engine parameters: {0}")]
    Engine(#[from] EngineError),

    #[error("date range is empty: start {start} is after end {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },
}

/// Complete, serializable backtest configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    pub exposure: ExposureConfig,
    pub execution: ExecutionConfig,
    pub grid: ParamGrid,
    pub walk_forward: WalkForwardConfig,
}

/// `[backtest]`: capital, data and the comparison instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub initial_capital: Decimal,
    /// CSV files with `symbol,timestamp,open,high,low,close,volume` rows.
    pub data_files: Vec<PathBuf>,
    /// Buy-and-hold comparison symbol; the core symbol when unset.
    pub baseline_symbol: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            data_files: Vec::new(),
            baseline_symbol: None,
            start: None,
            end: None,
        }
    }
}

/// `[strategy]`: instruments and indicator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategySection {
    pub signal_symbol: String,
    pub core_symbol: String,
    pub leveraged_symbol: String,
    /// Empty string disables the volatility-index tier.
    pub vix_symbol: String,
    pub kalman_process_noise: Decimal,
    pub kalman_measurement_noise: Decimal,
    pub kalman_settle_bars: usize,
    pub vol_lookback: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            signal_symbol: "SPY".into(),
            core_symbol: "SPY".into(),
            leveraged_symbol: "UPRO".into(),
            vix_symbol: "VIX".into(),
            kalman_process_noise: DEFAULT_PROCESS_NOISE,
            kalman_measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            kalman_settle_bars: 20,
            vol_lookback: 20,
        }
    }
}

impl BacktestConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.adaptive_config().validate()?;
        self.engine_config().validate()?;
        if let (Some(start), Some(end)) = (self.backtest.start, self.backtest.end) {
            if start > end {
                return Err(ConfigError::DateRange { start, end });
            }
        }
        Ok(())
    }

    /// Strategy parameters as the core crate expects them.
    pub fn adaptive_config(&self) -> AdaptiveConfig {
        let s = &self.strategy;
        let vix = s.vix_symbol.trim();
        AdaptiveConfig {
            signal_symbol: s.signal_symbol.clone(),
            core_symbol: s.core_symbol.clone(),
            leveraged_symbol: s.leveraged_symbol.clone(),
            vix_symbol: (!vix.is_empty()).then(|| vix.to_string()),
            kalman_process_noise: s.kalman_process_noise,
            kalman_measurement_noise: s.kalman_measurement_noise,
            kalman_settle_bars: s.kalman_settle_bars,
            vol_lookback: s.vol_lookback,
            exposure: self.exposure.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let baseline = self
            .backtest
            .baseline_symbol
            .clone()
            .unwrap_or_else(|| self.strategy.core_symbol.clone());
        EngineConfig::new(self.backtest.initial_capital)
            .with_execution(self.execution.clone())
            .with_baseline_symbol(baseline)
    }

    /// Symbols the data set must provide.
    pub fn required_symbols(&self) -> Vec<String> {
        let mut symbols = vec![self.strategy.signal_symbol.clone()];
        for s in [
            &self.strategy.core_symbol,
            &self.strategy.leveraged_symbol,
            &self.strategy.vix_symbol,
        ] {
            if !s.trim().is_empty() && !symbols.contains(s) {
                symbols.push(s.clone());
            }
        }
        symbols
    }

    /// Deterministic hash of everything that affects a run's outcome.
    ///
    /// Two runs with identical configs get the same id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_vec(&(&self.backtest, &self.adaptive_config(), &self.execution))?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
