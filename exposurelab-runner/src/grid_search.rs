//! Grid search over exposure parameters.
//!
//! Every cell gets its own strategy instance and runs the full event loop,
//! so a cell's result (baseline included) is exactly what a standalone run
//! with the same parameters produces.

use std::fmt;

use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use exposurelab_core::domain::Bar;

use crate::config::BacktestConfig;
use crate::runner::{run_backtest_from_data, BacktestResult, RunError};

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid cell {index} ({params}) failed: {source}")]
    Cell {
        index: usize,
        params: GridParams,
        #[source]
        source: Box<RunError>,
    },
}

/// Parameter grid specification (`[grid]` in the config file).
///
/// An empty list keeps the base config's value for that parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamGrid {
    pub k_trend: Vec<Decimal>,
    pub t_max: Vec<Decimal>,
    pub sigma_target: Vec<Decimal>,
    pub rebalance_threshold: Vec<Decimal>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            k_trend: vec![dec!(0.2), dec!(0.3), dec!(0.4)],
            t_max: Vec::new(),
            sigma_target: vec![dec!(0.15), dec!(0.20), dec!(0.25)],
            rebalance_threshold: Vec::new(),
        }
    }
}

/// One point in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridParams {
    pub k_trend: Decimal,
    pub t_max: Decimal,
    pub sigma_target: Decimal,
    pub rebalance_threshold: Decimal,
}

impl GridParams {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            k_trend: config.exposure.k_trend,
            t_max: config.exposure.t_max,
            sigma_target: config.exposure.sigma_target,
            rebalance_threshold: config.exposure.rebalance_threshold,
        }
    }

    /// `base` with these parameters substituted.
    pub fn apply(&self, base: &BacktestConfig) -> BacktestConfig {
        let mut config = base.clone();
        config.exposure.k_trend = self.k_trend;
        config.exposure.t_max = self.t_max;
        config.exposure.sigma_target = self.sigma_target;
        config.exposure.rebalance_threshold = self.rebalance_threshold;
        config
    }
}

impl fmt::Display for GridParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "k_trend={} t_max={} sigma_target={} rebalance_threshold={}",
            self.k_trend, self.t_max, self.sigma_target, self.rebalance_threshold
        )
    }
}

impl ParamGrid {
    /// Returns the total number of cells in this grid.
    pub fn size(&self) -> usize {
        [&self.k_trend, &self.t_max, &self.sigma_target, &self.rebalance_threshold]
            .iter()
            .map(|values| values.len().max(1))
            .product()
    }

    /// All cells, in a stable order (last parameter varies fastest).
    pub fn cells(&self, base: &BacktestConfig) -> Vec<GridParams> {
        let defaults = GridParams::from_config(base);
        let or_base = |values: &[Decimal], base: Decimal| {
            if values.is_empty() {
                vec![base]
            } else {
                values.to_vec()
            }
        };

        let mut cells = Vec::with_capacity(self.size());
        for k_trend in or_base(&self.k_trend, defaults.k_trend) {
            for t_max in or_base(&self.t_max, defaults.t_max) {
                for sigma_target in or_base(&self.sigma_target, defaults.sigma_target) {
                    for rebalance_threshold in or_base(&self.rebalance_threshold, defaults.rebalance_threshold) {
                        cells.push(GridParams {
                            k_trend,
                            t_max,
                            sigma_target,
                            rebalance_threshold,
                        });
                    }
                }
            }
        }
        cells
    }
}

/// Grid search executor.
#[derive(Debug, Clone)]
pub struct GridSearch {
    parallel: bool,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GridSearch {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every cell of `grid` over `bars`.
    ///
    /// Fails on the first cell whose parameters are invalid or whose run
    /// errors; no partial results are returned.
    pub fn run(
        &self,
        grid: &ParamGrid,
        base: &BacktestConfig,
        bars: &[Bar],
        dataset_hash: &str,
        synthetic: bool,
    ) -> Result<GridResults, GridError> {
        let cells = grid.cells(base);
        info!(cells = cells.len(), parallel = self.parallel, "grid search started");

        let run_cell = |(index, params): (usize, &GridParams)| -> Result<GridCellResult, GridError> {
            let config = params.apply(base);
            let result = run_backtest_from_data(&config, bars, dataset_hash, synthetic).map_err(|e| {
                GridError::Cell {
                    index,
                    params: *params,
                    source: Box::new(e),
                }
            })?;
            debug!(index, %params, sharpe = result.metrics.sharpe, "grid cell complete");
            Ok(GridCellResult {
                index,
                params: *params,
                result,
            })
        };

        let results = if self.parallel {
            cells
                .par_iter()
                .enumerate()
                .map(run_cell)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            cells.iter().enumerate().map(run_cell).collect::<Result<Vec<_>, _>>()?
        };

        Ok(GridResults::new(results))
    }
}

/// A grid cell and its backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCellResult {
    /// Position in [`ParamGrid::cells`] order.
    pub index: usize,
    pub params: GridParams,
    pub result: BacktestResult,
}

/// Results from a grid search, ranked best first by Sharpe ratio.
#[derive(Debug, Clone)]
pub struct GridResults {
    ranked: Vec<GridCellResult>,
}

impl GridResults {
    fn new(mut results: Vec<GridCellResult>) -> Self {
        results.sort_by(|a, b| {
            b.result
                .metrics
                .sharpe
                .total_cmp(&a.result.metrics.sharpe)
                .then_with(|| a.index.cmp(&b.index))
        });
        Self { ranked: results }
    }

    /// All cells, best first.
    pub fn ranked(&self) -> &[GridCellResult] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn best(&self) -> Option<&GridCellResult> {
        self.ranked.first()
    }

    pub fn top_n(&self, n: usize) -> &[GridCellResult] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// Cells back in grid order.
    pub fn in_grid_order(&self) -> Vec<&GridCellResult> {
        let mut cells: Vec<&GridCellResult> = self.ranked.iter().collect();
        cells.sort_by_key(|c| c.index);
        cells
    }
}
