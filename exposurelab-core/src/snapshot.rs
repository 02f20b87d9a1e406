//! Performance snapshots and the provenance tag that says how far to trust
//! them.
//!
//! Storage is somebody else's problem. The core only decides which
//! [`Provenance`] applies to a computation and fills the snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::RunResult;
use crate::exposure::{DrawdownTracker, ExposureInputs};

/// Which process produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Full scheduled evaluation with fresh indicator state.
    SchedulerAuthoritative,
    /// Price/equity refresh only; regime fields are carried over, not recomputed.
    RefreshOnly,
    /// Produced by a historical simulation.
    Backtest,
    /// Entered or edited by hand.
    Manual,
}

impl Provenance {
    /// Whether the regime/indicator fields were computed by this run.
    pub fn regime_fields_trusted(&self) -> bool {
        matches!(self, Provenance::SchedulerAuthoritative | Provenance::Backtest)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::SchedulerAuthoritative => "scheduler_authoritative",
            Provenance::RefreshOnly => "refresh_only",
            Provenance::Backtest => "backtest",
            Provenance::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Point-in-time performance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub as_of: DateTime<Utc>,
    pub provenance: Provenance,
    pub strategy: String,
    pub equity: Decimal,
    pub total_return: Decimal,
    pub drawdown: Decimal,
    pub max_drawdown: Decimal,
    pub baseline_return: Option<Decimal>,
    /// Target exposure behind the latest decision.
    pub exposure: Option<Decimal>,
    /// Indicator inputs behind `exposure`.
    pub regime: Option<ExposureInputs>,
}

impl PerformanceSnapshot {
    /// Snapshot of a finished backtest, always tagged [`Provenance::Backtest`].
    ///
    /// Drawdowns are measured over the trading window. `None` for a run
    /// with no equity points.
    pub fn from_backtest(result: &RunResult) -> Option<Self> {
        let last = result.equity_curve.last()?;
        let mut tracker = DrawdownTracker::new();
        for point in result.active_curve() {
            tracker.update(point.equity);
        }
        Some(Self {
            as_of: last.timestamp,
            provenance: Provenance::Backtest,
            strategy: result.strategy.clone(),
            equity: result.final_equity,
            total_return: result.total_return(),
            drawdown: tracker.drawdown(),
            max_drawdown: tracker.max_drawdown(),
            baseline_return: result.baseline.as_ref().map(|b| b.total_return),
            exposure: result.last_breakdown.map(|b| b.exposure),
            regime: result.last_breakdown.map(|b| b.inputs),
        })
    }

    /// Regime fields, only when the provenance vouches for them.
    pub fn trusted_regime(&self) -> Option<&ExposureInputs> {
        if self.provenance.regime_fields_trusted() {
            self.regime.as_ref()
        } else {
            None
        }
    }

    /// Same figures under a different provenance tag.
    pub fn retagged(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}
