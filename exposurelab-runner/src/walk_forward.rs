//! Walk-forward validation: rolling train/test windows over the signal
//! symbol's bars.
//!
//! Window lengths count signal-symbol bars. Each test run is handed the
//! `warmup` bars immediately before its window as a prefix, so the
//! strategy's indicators are settled exactly when the window opens and the
//! run's warmup end is the window's first bar. The test window's baseline
//! therefore covers the test window alone, and matches a standalone run over
//! the same slice.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use exposurelab_core::domain::Bar;
use exposurelab_core::engine::BaselineReport;

use crate::config::BacktestConfig;
use crate::data_loader::{dataset_hash, LoadedData};
use crate::grid_search::{GridError, GridParams, GridSearch};
use crate::metrics::{mean_f64, PerformanceMetrics};
use crate::runner::{run_backtest_from_data, RunError};

/// Walk-forward settings (`[walk_forward]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkForwardConfig {
    /// Train window length in signal bars, strategy warmup included.
    pub train_bars: usize,
    /// Test window length in signal bars.
    pub test_bars: usize,
    /// Offset between consecutive windows.
    pub step_bars: usize,
    /// Pick each window's parameters by grid search over its train window.
    pub optimize: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_bars: 252,
            test_bars: 63,
            step_bars: 63,
            optimize: false,
        }
    }
}

/// Window boundaries as half-open indices into the signal-bar timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// Result of a single window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowResult {
    pub spec: WindowSpec,
    pub params: GridParams,
    pub train_period: (DateTime<Utc>, DateTime<Utc>),
    pub test_period: (DateTime<Utc>, DateTime<Utc>),
    pub train: PerformanceMetrics,
    pub test: PerformanceMetrics,
    pub test_warmup_end: Option<DateTime<Utc>>,
    pub test_baseline: Option<BaselineReport>,
}

/// How the degradation ratio was computed (or why it wasn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationFlag {
    /// Train Sharpe >= 0.1, ratio computed normally.
    Normal,
    /// Train Sharpe < 0.1, using difference metric (test - train) instead.
    LowTrainSharpe,
    /// Train Sharpe is negative, ratio skipped entirely.
    NegativeTrainSharpe,
    /// Train Sharpe positive (>= 0.1) but test Sharpe negative: clamped to 0.0.
    FailedTest,
}

/// Complete result of walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    pub mean_train_sharpe: f64,
    pub mean_test_sharpe: f64,
    /// Mean test Sharpe / mean train Sharpe; `None` when not meaningful.
    pub degradation_ratio: Option<f64>,
    pub degradation_flag: DegradationFlag,
    /// Test-window returns compounded in sequence.
    pub chained_test_return: Decimal,
}

/// Errors from walk-forward validation.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("window lengths must be positive: train={train} test={test} step={step}")]
    InvalidWindow { train: usize, test: usize, step: usize },

    #[error("train window of {train} bars must exceed the strategy warmup of {warmup} bars")]
    TrainShorterThanWarmup { train: usize, warmup: usize },

    #[error("insufficient data: {primary_bars} signal bars < {required} needed for one window")]
    InsufficientData { primary_bars: usize, required: usize },

    #[error("backtest error in window {window}: {source}")]
    Backtest {
        window: usize,
        #[source]
        source: Box<RunError>,
    },

    #[error("grid search error in window {window}: {source}")]
    Grid {
        window: usize,
        #[source]
        source: GridError,
    },
}

/// Lay out rolling windows over `primary_bars` signal bars.
pub fn create_windows(
    primary_bars: usize,
    warmup: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<WindowSpec>, WalkForwardError> {
    let (train, test, step) = (config.train_bars, config.test_bars, config.step_bars);
    if train == 0 || test == 0 || step == 0 {
        return Err(WalkForwardError::InvalidWindow { train, test, step });
    }
    if train <= warmup {
        return Err(WalkForwardError::TrainShorterThanWarmup { train, warmup });
    }
    if primary_bars < train + test {
        return Err(WalkForwardError::InsufficientData {
            primary_bars,
            required: train + test,
        });
    }

    let mut windows = Vec::new();
    let mut start = 0;
    while start + train + test <= primary_bars {
        windows.push(WindowSpec {
            index: windows.len(),
            train_start: start,
            train_end: start + train,
            test_start: start + train,
            test_end: start + train + test,
        });
        start += step;
    }
    Ok(windows)
}

/// Distinct timestamps of `symbol`'s bars, ascending.
pub fn primary_timeline(bars: &[Bar], symbol: &str) -> Vec<DateTime<Utc>> {
    bars.iter()
        .filter(|b| b.symbol() == symbol)
        .map(|b| b.timestamp())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Bars of every symbol with `start <= timestamp <= end`.
pub fn slice_by_time(bars: &[Bar], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Bar> {
    bars.iter()
        .filter(|b| b.timestamp() >= start && b.timestamp() <= end)
        .cloned()
        .collect()
}

/// Bars for a window's test run: the warmup prefix plus the test window.
pub fn test_slice(bars: &[Bar], timeline: &[DateTime<Utc>], spec: &WindowSpec, warmup: usize) -> Vec<Bar> {
    slice_by_time(bars, timeline[spec.test_start - warmup], timeline[spec.test_end - 1])
}

/// Bars for a window's train run.
pub fn train_slice(bars: &[Bar], timeline: &[DateTime<Utc>], spec: &WindowSpec) -> Vec<Bar> {
    slice_by_time(bars, timeline[spec.train_start], timeline[spec.train_end - 1])
}

/// Run walk-forward validation of `base` over `data`.
///
/// With `optimize` set, each window's parameters are the best grid cell on
/// its train window; otherwise every window uses the base parameters.
pub fn run_walk_forward(
    base: &BacktestConfig,
    data: &LoadedData,
    search: &GridSearch,
) -> Result<WalkForwardResult, WalkForwardError> {
    let config = &base.walk_forward;
    let warmup = base.adaptive_config().warmup_bars();
    let timeline = primary_timeline(&data.bars, &base.strategy.signal_symbol);
    let windows = create_windows(timeline.len(), warmup, config)?;

    info!(
        windows = windows.len(),
        train_bars = config.train_bars,
        test_bars = config.test_bars,
        optimize = config.optimize,
        "walk-forward started"
    );

    let mut results = Vec::with_capacity(windows.len());
    for spec in &windows {
        let train_bars = train_slice(&data.bars, &timeline, spec);
        let train_hash = dataset_hash(&train_bars);

        let params = if config.optimize {
            let grid = search
                .run(&base.grid, base, &train_bars, &train_hash, data.synthetic)
                .map_err(|source| WalkForwardError::Grid {
                    window: spec.index,
                    source,
                })?;
            grid.best()
                .map(|cell| cell.params)
                .unwrap_or_else(|| GridParams::from_config(base))
        } else {
            GridParams::from_config(base)
        };
        let window_config = params.apply(base);

        let run = |bars: &[Bar], hash: &str| {
            run_backtest_from_data(&window_config, bars, hash, data.synthetic).map_err(|e| WalkForwardError::Backtest {
                window: spec.index,
                source: Box::new(e),
            })
        };
        let train = run(&train_bars, &train_hash)?;
        let test_bars = test_slice(&data.bars, &timeline, spec, warmup);
        let test = run(&test_bars, &dataset_hash(&test_bars))?;

        info!(
            window = spec.index,
            %params,
            train_sharpe = train.metrics.sharpe,
            test_sharpe = test.metrics.sharpe,
            "walk-forward window complete"
        );

        results.push(WindowResult {
            spec: *spec,
            params,
            train_period: (timeline[spec.train_start], timeline[spec.train_end - 1]),
            test_period: (timeline[spec.test_start], timeline[spec.test_end - 1]),
            train: train.metrics,
            test: test.metrics,
            test_warmup_end: test.run.warmup_end,
            test_baseline: test.run.baseline,
        });
    }

    Ok(compute_walk_forward_stats(results))
}

fn compute_walk_forward_stats(windows: Vec<WindowResult>) -> WalkForwardResult {
    let train: Vec<f64> = windows.iter().map(|w| w.train.sharpe).collect();
    let test: Vec<f64> = windows.iter().map(|w| w.test.sharpe).collect();
    let mean_train_sharpe = mean_f64(&train);
    let mean_test_sharpe = mean_f64(&test);
    let (degradation_ratio, degradation_flag) = compute_degradation_ratio(mean_train_sharpe, mean_test_sharpe);
    let chained_test_return = windows
        .iter()
        .fold(Decimal::ONE, |acc, w| acc * (Decimal::ONE + w.test.total_return))
        - Decimal::ONE;

    WalkForwardResult {
        windows,
        mean_train_sharpe,
        mean_test_sharpe,
        degradation_ratio,
        degradation_flag,
        chained_test_return,
    }
}

/// Compute degradation ratio with edge case handling.
///
/// - train >= 0.1: ratio = test / train (Normal)
/// - 0 <= train < 0.1: difference = test - train (LowTrainSharpe)
/// - train < 0: skipped (NegativeTrainSharpe)
/// - train >= 0.1 but test < 0: clamped to 0.0 (FailedTest)
fn compute_degradation_ratio(mean_train_sharpe: f64, mean_test_sharpe: f64) -> (Option<f64>, DegradationFlag) {
    if mean_train_sharpe < 0.0 {
        (None, DegradationFlag::NegativeTrainSharpe)
    } else if mean_train_sharpe < 0.1 {
        (Some(mean_test_sharpe - mean_train_sharpe), DegradationFlag::LowTrainSharpe)
    } else if mean_test_sharpe < 0.0 {
        (Some(0.0), DegradationFlag::FailedTest)
    } else {
        (Some(mean_test_sharpe / mean_train_sharpe), DegradationFlag::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{generate_synthetic, SyntheticConfig};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn wf(train: usize, test: usize, step: usize) -> WalkForwardConfig {
        WalkForwardConfig {
            train_bars: train,
            test_bars: test,
            step_bars: step,
            optimize: false,
        }
    }

    // ─── Window layout ───────────────────────────────────────────

    #[test]
    fn windows_roll_by_step() {
        let windows = create_windows(400, 50, &wf(200, 50, 50)).unwrap();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].train_start, 0);
        assert_eq!(windows[0].test_start, 200);
        assert_eq!(windows[3].train_start, 150);
        assert_eq!(windows[3].test_end, 400);
        for w in &windows {
            assert_eq!(w.train_end, w.test_start);
            assert_eq!(w.test_end - w.test_start, 50);
        }
    }

    #[test]
    fn train_must_exceed_warmup() {
        assert!(matches!(
            create_windows(400, 50, &wf(50, 50, 50)).unwrap_err(),
            WalkForwardError::TrainShorterThanWarmup { train: 50, warmup: 50 }
        ));
    }

    #[test]
    fn insufficient_data() {
        assert!(matches!(
            create_windows(240, 50, &wf(200, 50, 50)).unwrap_err(),
            WalkForwardError::InsufficientData { primary_bars: 240, required: 250 }
        ));
    }

    #[test]
    fn zero_lengths_rejected() {
        assert!(matches!(
            create_windows(400, 10, &wf(200, 50, 0)).unwrap_err(),
            WalkForwardError::InvalidWindow { .. }
        ));
        assert!(matches!(
            create_windows(400, 10, &wf(200, 0, 10)).unwrap_err(),
            WalkForwardError::InvalidWindow { .. }
        ));
    }

    // ─── Degradation ─────────────────────────────────────────────

    #[test]
    fn degradation_cases() {
        assert_eq!(compute_degradation_ratio(1.0, 0.5), (Some(0.5), DegradationFlag::Normal));
        assert_eq!(compute_degradation_ratio(-0.2, 0.5), (None, DegradationFlag::NegativeTrainSharpe));
        assert_eq!(compute_degradation_ratio(1.0, -0.3), (Some(0.0), DegradationFlag::FailedTest));
        let (diff, flag) = compute_degradation_ratio(0.05, 0.25);
        assert_eq!(flag, DegradationFlag::LowTrainSharpe);
        assert!((diff.unwrap() - 0.2).abs() < 1e-12);
    }

    // ─── End to end ──────────────────────────────────────────────

    fn setup() -> (BacktestConfig, LoadedData) {
        let mut config = BacktestConfig::default();
        config.walk_forward = wf(150, 50, 50);
        let synthetic =
            SyntheticConfig::for_backtest(&config, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), 400, 5);
        (config, LoadedData::new(generate_synthetic(&synthetic).unwrap(), true))
    }

    #[test]
    fn test_windows_start_trading_at_window_open() {
        let (config, data) = setup();
        let result = run_walk_forward(&config, &data, &GridSearch::new()).unwrap();
        assert_eq!(result.windows.len(), 5);

        let timeline = primary_timeline(&data.bars, "SPY");
        for w in &result.windows {
            assert_eq!(w.test_warmup_end, Some(timeline[w.spec.test_start]));
            let baseline = w.test_baseline.as_ref().unwrap();
            assert_eq!(baseline.start, timeline[w.spec.test_start]);
            assert_eq!(baseline.end, timeline[w.spec.test_end - 1]);
            assert_eq!(baseline.bars, 50);
            assert_eq!(w.params, GridParams::from_config(&config));
        }
    }

    #[test]
    fn chained_return_compounds_windows() {
        let (config, data) = setup();
        let result = run_walk_forward(&config, &data, &GridSearch::new()).unwrap();
        let expected = result
            .windows
            .iter()
            .fold(dec!(1), |acc, w| acc * (dec!(1) + w.test.total_return))
            - dec!(1);
        assert_eq!(result.chained_test_return, expected);
    }

    #[test]
    fn optimized_windows_pick_grid_params() {
        let (mut config, data) = setup();
        config.walk_forward.optimize = true;
        config.grid.k_trend = vec![dec!(0.2), dec!(0.4)];
        config.grid.sigma_target = vec![dec!(0.2)];
        let result = run_walk_forward(&config, &data, &GridSearch::new().with_parallelism(false)).unwrap();
        for w in &result.windows {
            assert!(config.grid.k_trend.contains(&w.params.k_trend));
            assert_eq!(w.params.sigma_target, dec!(0.2));
        }
    }
}
