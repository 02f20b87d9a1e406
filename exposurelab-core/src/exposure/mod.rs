//! Adaptive exposure: tier pipeline, governor policies, position mapping,
//! rebalance gate and drawdown tracking.

pub mod config;
pub mod drawdown;
pub mod governor;
pub mod rebalance;
pub mod tiers;
pub mod weights;

pub use config::{ExposureConfig, ExposureConfigError, MAX_REACHABLE_EXPOSURE};
pub use drawdown::DrawdownTracker;
pub use governor::{drawdown_compression, GovernorPolicy};
pub use rebalance::{RebalanceDecision, RebalanceGate};
pub use tiers::{
    clip_exposure, normalize_trend, scale_deviation, trend_exposure, vix_compression, vol_scaler,
    ExposureBreakdown, ExposureInputs, ExposurePipeline,
};
pub use weights::{TargetWeights, LEVERAGE_MULTIPLE};
