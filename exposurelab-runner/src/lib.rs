//! ExposureLab Runner — backtest orchestration, batch modes, metrics, export.
//!
//! This crate builds on `exposurelab-core` to provide:
//! - TOML configuration with a content-addressed run id
//! - CSV bar loading and a seeded synthetic data generator
//! - Single-backtest runner with performance metrics and a backtest snapshot
//! - Grid search (rayon) and walk-forward validation
//! - Readiness status context for the owning process
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod grid_search;
pub mod metrics;
pub mod runner;
pub mod status;
pub mod walk_forward;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{generate_synthetic, load_bars, LoadError, LoadedData, SyntheticConfig};
pub use export::{save_artifacts, ExportError, RunSummary};
pub use grid_search::{GridError, GridParams, GridResults, GridSearch, ParamGrid};
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest_from_data, run_loaded, run_single_backtest, BacktestResult, RunError};
pub use status::{Readiness, StatusContext, StatusSnapshot};
pub use walk_forward::{run_walk_forward, DegradationFlag, WalkForwardConfig, WalkForwardError, WalkForwardResult};
