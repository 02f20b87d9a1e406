//! Engine configuration, mutable run state, and run result types.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::baseline::BaselineReport;
use super::error::EngineError;
use super::phase::{PhaseTracker, RunPhase};
use super::simulator::ExecutionConfig;
use crate::domain::{Fill, IdGen, Portfolio};
use crate::exposure::ExposureBreakdown;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: Decimal,
    pub execution: ExecutionConfig,
    /// Buy-and-hold comparison instrument; the strategy's primary symbol
    /// when unset.
    pub baseline_symbol: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            execution: ExecutionConfig::frictionless(),
            baseline_symbol: None,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_baseline_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.baseline_symbol = Some(symbol.into());
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(EngineError::InitialCapital(self.initial_capital));
        }
        self.execution.validate()
    }
}

/// Mutable state that evolves bar-by-bar during one run.
#[derive(Debug)]
pub struct EngineState {
    pub portfolio: Portfolio,
    pub ids: IdGen,
    pub phase: PhaseTracker,
    /// Latest close per symbol; the mark for equity and weights.
    pub last_close: HashMap<String, Decimal>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
    pub bar_count: usize,
    /// Signals emitted while active and handed to the simulator.
    pub signal_count: usize,
    /// Signals discarded because the run was still warming up.
    pub warmup_signals: usize,
    /// Signals that produced no fill (no bar to fill on, nothing to sell,
    /// unreached limit, no cash).
    pub unfilled_signals: usize,
}

impl EngineState {
    pub fn new(initial_capital: Decimal, warmup_bars: usize) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            ids: IdGen::default(),
            phase: PhaseTracker::new(warmup_bars),
            last_close: HashMap::new(),
            fills: Vec::new(),
            equity_curve: Vec::new(),
            bar_count: 0,
            signal_count: 0,
            warmup_signals: 0,
            unfilled_signals: 0,
        }
    }

    pub fn equity(&self) -> Decimal {
        self.portfolio.equity(&self.last_close)
    }

    /// Append the end-of-timestamp mark.
    pub fn record_equity(&mut self, timestamp: DateTime<Utc>) {
        let equity = self.equity();
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity,
            cash: self.portfolio.cash,
            weights: self.portfolio.weights(&self.last_close),
            phase: self.phase.phase(),
        });
    }
}

/// Equity and weights after all fills at one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    pub cash: Decimal,
    /// Market value per held symbol as a fraction of equity.
    pub weights: BTreeMap<String, Decimal>,
    pub phase: RunPhase,
}

impl EquityPoint {
    pub fn cash_weight(&self) -> Decimal {
        if self.equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.cash / self.equity
    }

    pub fn weight(&self, symbol: &str) -> Decimal {
        self.weights.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    pub phase: RunPhase,
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
    /// First primary-bar timestamp of the trading window. `None` when no
    /// warmup was configured or warmup never completed.
    pub warmup_end: Option<DateTime<Utc>>,
    pub warmup_bars: usize,
    pub bar_count: usize,
    pub primary_bar_count: usize,
    /// Active-phase signals only; warmup emissions are in `warmup_signals`.
    pub signal_count: usize,
    pub warmup_signals: usize,
    pub unfilled_signals: usize,
    pub total_commission: Decimal,
    pub total_slippage: Decimal,
    pub realized_pnl: Decimal,
    pub baseline: Option<BaselineReport>,
    pub last_breakdown: Option<ExposureBreakdown>,
}

impl RunResult {
    /// `(final - initial) / initial`.
    pub fn total_return(&self) -> Decimal {
        if self.initial_capital <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.final_equity - self.initial_capital) / self.initial_capital
    }

    /// Strategy return minus baseline return, when a baseline exists.
    pub fn excess_return(&self) -> Option<Decimal> {
        self.baseline.as_ref().map(|b| self.total_return() - b.total_return)
    }

    /// Equity points inside the trading window.
    pub fn active_curve(&self) -> impl Iterator<Item = &EquityPoint> {
        self.equity_curve.iter().filter(|p| p.phase == RunPhase::Active)
    }
}
