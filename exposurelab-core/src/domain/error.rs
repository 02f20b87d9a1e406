//! Validation failures raised while constructing events.

use rust_decimal::Decimal;
use thiserror::Error;

/// Why an event could not be constructed.
///
/// Every variant is fatal for the event being built: no partially-constructed
/// value is ever returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error(
        "invalid OHLC for {symbol}: low={low} open={open} close={close} high={high} \
         (require low <= open,close <= high)"
    )]
    InvalidOhlc {
        symbol: String,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },

    #[error("negative volume for {symbol}: {volume}")]
    NegativeVolume { symbol: String, volume: Decimal },

    #[error("quantity must be positive for {symbol}, got {quantity}")]
    NonPositiveQuantity { symbol: String, quantity: Decimal },

    #[error("limit order for {symbol} requires a positive limit price")]
    MissingLimitPrice { symbol: String },

    #[error("{field} must be non-negative for {symbol}, got {value}")]
    NegativeCost {
        symbol: String,
        field: &'static str,
        value: Decimal,
    },

    #[error("price must be positive for {symbol}, got {price}")]
    NonPositivePrice { symbol: String, price: Decimal },
}
