//! Domain types: the immutable, validated event records and portfolio state.

pub mod bar;
pub mod error;
pub mod fill;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod signal;

pub use bar::{Bar, BarRecord, Timeframe};
pub use error::EventError;
pub use fill::Fill;
pub use ids::{FillId, IdGen, OrderId};
pub use order::{Order, OrderKind, OrderSide};
pub use portfolio::Portfolio;
pub use position::Position;
pub use signal::{Signal, SignalDirection, UNKNOWN_STRATEGY};

/// Symbol type alias
pub type Symbol = String;
