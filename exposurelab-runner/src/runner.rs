//! Backtest runner — wires together config, data, strategy, engine and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads the configured data files, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. Used by grid search and
//!   walk-forward, which run many configs over the same data.
//!
//! Both build a fresh strategy per call, so no indicator or drawdown state
//! leaks between runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use exposurelab_core::domain::Bar;
use exposurelab_core::engine::{run_backtest, EngineError, RunResult};
use exposurelab_core::snapshot::PerformanceSnapshot;
use exposurelab_core::strategy::{AdaptiveExposureStrategy, StrategyConfigError};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_bars, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    /// Latest state of the run, tagged as a backtest snapshot.
    pub snapshot: Option<PerformanceSnapshot>,
    pub rebalance_count: usize,
    pub run: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Strategy identifier, e.g. `adaptive_exposure_symmetric`.
    pub fn strategy(&self) -> &str {
        &self.run.strategy
    }
}

/// Run a single backtest from a config, loading its data files.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let loaded = load_bars(config)?;
    run_loaded(config, &loaded)
}

/// Run over data that was already loaded or generated.
pub fn run_loaded(config: &BacktestConfig, data: &LoadedData) -> Result<BacktestResult, RunError> {
    run_backtest_from_data(config, &data.bars, &data.dataset_hash, data.synthetic)
}

/// Run a backtest with pre-loaded bars; no I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    bars: &[Bar],
    dataset_hash: &str,
    synthetic: bool,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let mut strategy = AdaptiveExposureStrategy::new(config.adaptive_config())?;
    let run = run_backtest(bars, &mut strategy, &config.engine_config())?;

    let metrics = PerformanceMetrics::compute(&run);
    let snapshot = PerformanceSnapshot::from_backtest(&run);

    info!(
        run_id = %&run_id[..12],
        strategy = %run.strategy,
        total_return = %metrics.total_return.round_dp(4),
        baseline = ?metrics.baseline_return.map(|r| r.round_dp(4)),
        sharpe = metrics.sharpe,
        trades = metrics.trade_count,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: dataset_hash.to_string(),
        synthetic,
        config: config.clone(),
        metrics,
        snapshot,
        rebalance_count: strategy.rebalance_count(),
        run,
    })
}
