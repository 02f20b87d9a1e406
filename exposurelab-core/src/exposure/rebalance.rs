//! Rebalance gate — hysteresis between held and target weights.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::ExposureConfigError;
use super::weights::TargetWeights;

/// Outcome of one gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceDecision {
    pub distance: Decimal,
    pub triggered: bool,
}

/// Triggers only when the L1 distance strictly exceeds the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceGate {
    threshold: Decimal,
}

impl RebalanceGate {
    pub fn new(threshold: Decimal) -> Result<Self, ExposureConfigError> {
        if threshold < Decimal::ZERO {
            return Err(ExposureConfigError::RebalanceThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    pub fn evaluate(&self, held: &TargetWeights, target: &TargetWeights) -> RebalanceDecision {
        let distance = held.l1_distance(target);
        RebalanceDecision {
            distance,
            triggered: distance > self.threshold,
        }
    }

    pub fn should_rebalance(&self, held: &TargetWeights, target: &TargetWeights) -> bool {
        self.evaluate(held, target).triggered
    }
}
