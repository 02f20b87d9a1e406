//! ExposureLab Core — event model, exposure pipeline, strategies and the
//! backtest event loop.
//!
//! - Domain events (bars, signals, orders, fills) with exact decimal values
//! - Rolling indicators (Kalman trend, realized volatility, SMA)
//! - Five-tier exposure pipeline with a selectable drawdown governor
//! - Core/leveraged position mapping, rebalance gate, drawdown tracker
//! - Strategy trait and the adaptive-exposure strategy
//! - WARMUP → ACTIVE → FINALIZED event loop with warmup-excluded baseline
//! - Provenance-tagged performance snapshots

pub mod domain;
pub mod engine;
pub mod exposure;
pub mod indicators;
pub mod snapshot;
pub mod strategy;
