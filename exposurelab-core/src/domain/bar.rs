//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::EventError;

/// Bar interval label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Minute,
    Hour,
    #[default]
    Daily,
    Weekly,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::Minute => "1m",
            Timeframe::Hour => "1h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        };
        f.write_str(label)
    }
}

/// Unvalidated bar fields, as they arrive from a data feed or a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    #[serde(default)]
    pub timeframe: Timeframe,
}

/// OHLCV bar for a single symbol over one timeframe.
///
/// Construction enforces `low <= open, close <= high` and `volume >= 0`.
/// Fields are private so an accepted bar cannot be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BarRecord", into = "BarRecord")]
pub struct Bar {
    symbol: String,
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    timeframe: Timeframe,
}

impl Bar {
    /// Build a daily bar, validating OHLC ordering and volume.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, EventError> {
        Self::try_from(BarRecord {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            timeframe: Timeframe::Daily,
        })
    }

    /// Same bar relabelled with another timeframe.
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Whether `price` lies inside this bar's traded range.
    pub fn contains(&self, price: Decimal) -> bool {
        self.low <= price && price <= self.high
    }
}

impl TryFrom<BarRecord> for Bar {
    type Error = EventError;

    fn try_from(raw: BarRecord) -> Result<Self, Self::Error> {
        if raw.symbol.trim().is_empty() {
            return Err(EventError::EmptySymbol);
        }
        let ordered = raw.low <= raw.high
            && raw.low <= raw.open
            && raw.open <= raw.high
            && raw.low <= raw.close
            && raw.close <= raw.high;
        if !ordered {
            return Err(EventError::InvalidOhlc {
                symbol: raw.symbol,
                open: raw.open,
                high: raw.high,
                low: raw.low,
                close: raw.close,
            });
        }
        if raw.volume < Decimal::ZERO {
            return Err(EventError::NegativeVolume {
                symbol: raw.symbol,
                volume: raw.volume,
            });
        }
        Ok(Self {
            symbol: raw.symbol,
            timestamp: raw.timestamp,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            timeframe: raw.timeframe,
        })
    }
}

impl From<Bar> for BarRecord {
    fn from(bar: Bar) -> Self {
        Self {
            symbol: bar.symbol,
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            timeframe: bar.timeframe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap()
    }

    fn sample_bar() -> Bar {
        Bar::new("QQQ", ts(), dec!(400), dec!(405), dec!(398), dec!(403), dec!(50000)).unwrap()
    }

    #[test]
    fn valid_bar_constructs() {
        let bar = sample_bar();
        assert_eq!(bar.symbol(), "QQQ");
        assert_eq!(bar.close(), dec!(403));
        assert_eq!(bar.timeframe(), Timeframe::Daily);
    }

    #[test]
    fn high_below_low_is_rejected() {
        let err = Bar::new("QQQ", ts(), dec!(100), dec!(97), dec!(98), dec!(99), dec!(1)).unwrap_err();
        assert!(matches!(err, EventError::InvalidOhlc { .. }));
    }

    #[test]
    fn close_above_high_is_rejected() {
        let err = Bar::new("QQQ", ts(), dec!(100), dec!(101), dec!(99), dec!(102), dec!(1)).unwrap_err();
        assert!(matches!(err, EventError::InvalidOhlc { .. }));
    }

    #[test]
    fn open_below_low_is_rejected() {
        let err = Bar::new("QQQ", ts(), dec!(98), dec!(101), dec!(99), dec!(100), dec!(1)).unwrap_err();
        assert!(matches!(err, EventError::InvalidOhlc { .. }));
    }

    #[test]
    fn negative_volume_is_rejected() {
        let err = Bar::new("QQQ", ts(), dec!(100), dec!(101), dec!(99), dec!(100), dec!(-1)).unwrap_err();
        assert!(matches!(err, EventError::NegativeVolume { .. }));
    }

    #[test]
    fn zero_volume_and_flat_bar_are_accepted() {
        let bar = Bar::new("QQQ", ts(), dec!(100), dec!(100), dec!(100), dec!(100), dec!(0));
        assert!(bar.is_ok());
    }

    #[test]
    fn empty_symbol_is_rejected() {
        let err = Bar::new(" ", ts(), dec!(100), dec!(101), dec!(99), dec!(100), dec!(1)).unwrap_err();
        assert_eq!(err, EventError::EmptySymbol);
    }

    #[test]
    fn deserialization_validates() {
        let json = r#"{"symbol":"QQQ","timestamp":"2024-01-02T21:00:00Z","open":"100","high":"99","low":"98","close":"99","volume":"10"}"#;
        let result: Result<Bar, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn contains_checks_range() {
        let bar = sample_bar();
        assert!(bar.contains(dec!(398)));
        assert!(bar.contains(dec!(405)));
        assert!(!bar.contains(dec!(405.01)));
    }
}
