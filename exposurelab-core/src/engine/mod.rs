//! Backtesting engine: phase tracking, execution simulation, the event loop
//! and the warmup-excluded baseline.

pub mod baseline;
pub mod error;
pub mod loop_runner;
pub mod phase;
pub mod simulator;
pub mod state;

pub use baseline::{baseline_return, BaselineReport};
pub use error::EngineError;
pub use loop_runner::run_backtest;
pub use phase::{PhaseTracker, RunPhase};
pub use simulator::{ExecutionConfig, ExecutionSimulator};
pub use state::{EngineConfig, EngineState, EquityPoint, RunResult};
