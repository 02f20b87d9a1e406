//! Bar loading for the runner.
//!
//! Real data comes from CSV files, one row per bar:
//!
//! ```text
//! symbol,timestamp,open,high,low,close,volume
//! SPY,2024-01-02,472.16,473.67,470.49,472.65,123623700
//! ```
//!
//! Timestamps are RFC 3339 or plain `YYYY-MM-DD` (midnight UTC). Files may
//! hold one symbol or several; all files are merged into a single stream
//! ordered by timestamp, then symbol.
//!
//! Synthetic data is a seeded random walk for demos and tests: an index
//! path shared by the signal and core symbols, a leveraged series that
//! compounds three times the index's daily return, and a volatility index
//! that rises when the index falls.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use exposurelab_core::domain::{Bar, EventError};

use crate::config::BacktestConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data files configured (set [backtest].data_files or use synthetic data)")]
    NoDataFiles,

    #[error("cannot open {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: malformed CSV: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file} row {row}: invalid {field} '{value}'")]
    Field {
        file: String,
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("{file} row {row}: {source}")]
    InvalidBar {
        file: String,
        row: usize,
        #[source]
        source: EventError,
    },

    #[error("{file} contains no bars")]
    Empty { file: String },

    #[error("duplicate bar for {symbol} at {timestamp}")]
    Duplicate {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("no bars for required symbol '{symbol}'")]
    MissingSymbol { symbol: String },
}

/// Merged bars plus a fingerprint of their content.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every bar's fields, in stream order.
    pub dataset_hash: String,
    pub synthetic: bool,
}

impl LoadedData {
    pub fn new(bars: Vec<Bar>, synthetic: bool) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            dataset_hash,
            synthetic,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    symbol: String,
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Load the config's data files, merge them, apply its date range and check
/// every required symbol is present.
pub fn load_bars(config: &BacktestConfig) -> Result<LoadedData, LoadError> {
    if config.backtest.data_files.is_empty() {
        return Err(LoadError::NoDataFiles);
    }
    let streams = config
        .backtest
        .data_files
        .iter()
        .map(|path| load_csv(path))
        .collect::<Result<Vec<_>, _>>()?;
    let bars = filter_dates(merge_streams(streams)?, config.backtest.start, config.backtest.end);
    require_symbols(&bars, &config.required_symbols())?;

    info!(
        files = config.backtest.data_files.len(),
        bars = bars.len(),
        "data loaded"
    );
    Ok(LoadedData::new(bars, false))
}

/// Read every bar in one CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file, &path.display().to_string())?;
    debug!(file = %path.display(), bars = bars.len(), "csv parsed");
    Ok(bars)
}

/// Parse CSV bars from any reader. `file` labels errors.
pub fn read_bars<R: Read>(reader: R, file: &str) -> Result<Vec<Bar>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (i, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let row = i + 2;
        let record = record.map_err(|source| LoadError::Csv {
            file: file.to_string(),
            source,
        })?;
        let decimal = |field: &'static str, value: &str| {
            Decimal::from_str(value).map_err(|_| LoadError::Field {
                file: file.to_string(),
                row,
                field,
                value: value.to_string(),
            })
        };
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Field {
            file: file.to_string(),
            row,
            field: "timestamp",
            value: record.timestamp.clone(),
        })?;
        let bar = Bar::new(
            record.symbol,
            timestamp,
            decimal("open", &record.open)?,
            decimal("high", &record.high)?,
            decimal("low", &record.low)?,
            decimal("close", &record.close)?,
            decimal("volume", &record.volume)?,
        )
        .map_err(|source| LoadError::InvalidBar {
            file: file.to_string(),
            row,
            source,
        })?;
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty { file: file.to_string() });
    }
    Ok(bars)
}

/// RFC 3339, or a bare date at midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(date_to_timestamp(date))
}

fn date_to_timestamp(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Write bars in the format [`read_bars`] accepts.
pub fn write_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let file = path.display().to_string();
    let csv_error = |source| LoadError::Csv {
        file: file.clone(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
    wtr.write_record(["symbol", "timestamp", "open", "high", "low", "close", "volume"])
        .map_err(csv_error)?;
    for bar in bars {
        wtr.write_record([
            bar.symbol().to_string(),
            bar.timestamp().to_rfc3339(),
            bar.open().to_string(),
            bar.high().to_string(),
            bar.low().to_string(),
            bar.close().to_string(),
            bar.volume().to_string(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        file: path.to_path_buf(),
        source,
    })
}

// ─── Stream shaping ─────────────────────────────────────────────────

/// Merge per-file streams into one ordered by timestamp, then symbol.
///
/// Two bars for the same symbol and timestamp are rejected rather than
/// silently picking one.
pub fn merge_streams(streams: Vec<Vec<Bar>>) -> Result<Vec<Bar>, LoadError> {
    let mut bars: Vec<Bar> = streams.into_iter().flatten().collect();
    bars.sort_by(|a, b| {
        a.timestamp()
            .cmp(&b.timestamp())
            .then_with(|| a.symbol().cmp(b.symbol()))
    });
    if let Some(pair) = bars
        .windows(2)
        .find(|w| w[0].timestamp() == w[1].timestamp() && w[0].symbol() == w[1].symbol())
    {
        return Err(LoadError::Duplicate {
            symbol: pair[1].symbol().to_string(),
            timestamp: pair[1].timestamp(),
        });
    }
    Ok(bars)
}

/// Keep bars whose date falls inside `[start, end]`. Open ends are unbounded.
pub fn filter_dates(bars: Vec<Bar>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| {
            let date = b.timestamp().date_naive();
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        })
        .collect()
}

/// Fail on the first required symbol with no bars.
pub fn require_symbols(bars: &[Bar], symbols: &[String]) -> Result<(), LoadError> {
    let present: HashSet<&str> = bars.iter().map(|b| b.symbol()).collect();
    match symbols.iter().find(|s| !present.contains(s.as_str())) {
        Some(symbol) => Err(LoadError::MissingSymbol { symbol: symbol.clone() }),
        None => Ok(()),
    }
}

/// Content hash of a bar stream; identical data gives identical hashes.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        let line = format!(
            "{}|{}|{}|{}|{}|{}|{}\n",
            bar.symbol(),
            bar.timestamp().to_rfc3339(),
            bar.open(),
            bar.high(),
            bar.low(),
            bar.close(),
            bar.volume()
        );
        hasher.update(line.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ─── Synthetic data ─────────────────────────────────────────────────

/// Parameters for a seeded synthetic universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticConfig {
    /// Symbols that follow the index path (signal and core).
    pub index_symbols: Vec<String>,
    pub leveraged_symbol: String,
    pub vix_symbol: Option<String>,
    pub start: NaiveDate,
    /// Weekdays to generate.
    pub days: usize,
    pub seed: u64,
    pub start_price: Decimal,
}

impl SyntheticConfig {
    /// Universe matching a backtest config's instruments.
    pub fn for_backtest(config: &BacktestConfig, start: NaiveDate, days: usize, seed: u64) -> Self {
        let s = &config.strategy;
        let mut index_symbols = vec![s.signal_symbol.clone()];
        if s.core_symbol != s.signal_symbol {
            index_symbols.push(s.core_symbol.clone());
        }
        let vix = s.vix_symbol.trim();
        Self {
            index_symbols,
            leveraged_symbol: s.leveraged_symbol.clone(),
            vix_symbol: (!vix.is_empty()).then(|| vix.to_string()),
            start,
            days,
            seed,
            start_price: dec!(100),
        }
    }
}

/// Generate the synthetic universe as one merged stream.
///
/// The same config always produces the same bars.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<Vec<Bar>, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_material = format!("{}:{}", config.seed, config.index_symbols.join(","));
    let mut rng = StdRng::from_seed(*blake3::hash(seed_material.as_bytes()).as_bytes());

    let mut index = config.start_price;
    let mut leveraged = config.start_price;
    let mut vix = dec!(16);
    let mut stressed = false;
    let mut date = config.start;
    let mut generated = 0;
    let mut bars = Vec::with_capacity(config.days * (config.index_symbols.len() + 2));

    while generated < config.days {
        let weekday = date.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            date += chrono::Duration::days(1);
            continue;
        }

        // Regimes persist; roughly one switch every 50 days.
        if rng.gen_range(0..50) == 0 {
            stressed = !stressed;
        }
        let (range_bps, vix_target) = if stressed { (300, dec!(32)) } else { (110, dec!(14)) };
        let daily_return = Decimal::new(rng.gen_range(-range_bps..=range_bps + 8), 4);
        let timestamp = date_to_timestamp(date);

        let index_close = (index * (Decimal::ONE + daily_return)).round_dp(2).max(dec!(0.01));
        for symbol in &config.index_symbols {
            bars.push(synthetic_bar(&mut rng, symbol, timestamp, index, index_close)?);
        }

        let lev_close = (leveraged * (Decimal::ONE + daily_return * dec!(3)))
            .round_dp(2)
            .max(dec!(0.01));
        bars.push(synthetic_bar(
            &mut rng,
            &config.leveraged_symbol,
            timestamp,
            leveraged,
            lev_close,
        )?);

        if let Some(symbol) = &config.vix_symbol {
            let vix_close = (vix + (vix_target - vix) * dec!(0.2) - daily_return * dec!(80))
                .max(dec!(9))
                .round_dp(2);
            bars.push(synthetic_bar(&mut rng, symbol, timestamp, vix, vix_close)?);
            vix = vix_close;
        }

        index = index_close;
        leveraged = lev_close;
        generated += 1;
        date += chrono::Duration::days(1);
    }

    // Emitted in timestamp order already; sort within each day by symbol.
    let bars = merge_streams(vec![bars])?;
    debug!(bars = bars.len(), seed = config.seed, "synthetic data generated");
    Ok(bars)
}

fn synthetic_bar(
    rng: &mut impl rand::Rng,
    symbol: &str,
    timestamp: DateTime<Utc>,
    open: Decimal,
    close: Decimal,
) -> Result<Bar, LoadError> {
    let upper = Decimal::new(rng.gen_range(0..=50), 4);
    let lower = Decimal::new(rng.gen_range(0..=50), 4);
    let high = (open.max(close) * (Decimal::ONE + upper)).round_dp(2);
    let low = (open.min(close) * (Decimal::ONE - lower)).round_dp(2).max(dec!(0.01));
    let volume = Decimal::from(rng.gen_range(500_000u64..5_000_000));
    Bar::new(symbol, timestamp, open, high, low.min(open.min(close)), close, volume).map_err(|source| {
        LoadError::InvalidBar {
            file: "synthetic".to_string(),
            row: 0,
            source,
        }
    })
}
