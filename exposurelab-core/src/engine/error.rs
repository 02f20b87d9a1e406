//! Engine-level failures. Missing warmup data is not one of them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::EventError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("bar stream is empty")]
    NoBars,

    #[error("bar {index} ({symbol} @ {current}) is earlier than the previous bar @ {previous}")]
    OutOfOrder {
        index: usize,
        symbol: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("baseline symbol {0:?} has no bars in the stream")]
    UnknownBaselineSymbol(String),

    #[error("initial capital must be > 0, got {0}")]
    InitialCapital(Decimal),

    #[error("execution {field} must be >= 0, got {value}")]
    ExecutionCost { field: &'static str, value: Decimal },

    #[error(transparent)]
    Event(#[from] EventError),
}
