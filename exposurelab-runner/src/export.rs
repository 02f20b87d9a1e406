//! Artifact export — JSON and CSV.
//!
//! - **JSON**: full result with schema versioning, plus a compact summary
//! - **CSV**: fill ledger and equity curve for external analysis tools
//!
//! Full results carry a `schema_version`; newer versions are rejected on load.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use exposurelab_core::domain::{Fill, OrderSide};
use exposurelab_core::engine::{BaselineReport, EquityPoint};
use exposurelab_core::snapshot::PerformanceSnapshot;

use crate::metrics::PerformanceMetrics;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported schema version {found} (max supported: {supported})")]
    SchemaVersion { found: u32, supported: u32 },
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult, ExportError> {
    let result: BacktestResult = serde_json::from_str(json)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: result.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

/// Headline figures of a run, without the ledger and curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub run_id: String,
    pub strategy: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub warmup_end: Option<DateTime<Utc>>,
    pub bar_count: usize,
    pub signal_count: usize,
    pub rebalance_count: usize,
    pub metrics: PerformanceMetrics,
    pub baseline: Option<BaselineReport>,
    pub snapshot: Option<PerformanceSnapshot>,
}

impl RunSummary {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            schema_version: result.schema_version,
            run_id: result.run_id.clone(),
            strategy: result.run.strategy.clone(),
            dataset_hash: result.dataset_hash.clone(),
            synthetic: result.synthetic,
            initial_capital: result.run.initial_capital,
            final_equity: result.run.final_equity,
            warmup_end: result.run.warmup_end,
            bar_count: result.run.bar_count,
            signal_count: result.run.signal_count,
            rebalance_count: result.rebalance_count,
            metrics: result.metrics.clone(),
            baseline: result.run.baseline.clone(),
            snapshot: result.snapshot.clone(),
        }
    }
}

pub fn export_summary_json(result: &BacktestResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&RunSummary::from_result(result))?)
}

// ─── CSV export ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct FillRow<'a> {
    fill_id: u64,
    order_id: u64,
    timestamp: String,
    symbol: &'a str,
    side: OrderSide,
    quantity: Decimal,
    price: Decimal,
    notional: Decimal,
    commission: Decimal,
    slippage: Decimal,
    cash_delta: Decimal,
}

/// Export the fill ledger as CSV.
///
/// Columns: fill_id, order_id, timestamp, symbol, side, quantity, price,
/// notional, commission, slippage, cash_delta
pub fn export_trades_csv(fills: &[Fill]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for f in fills {
        wtr.serialize(FillRow {
            fill_id: f.id().0,
            order_id: f.order_id().0,
            timestamp: f.timestamp().to_rfc3339(),
            symbol: f.symbol(),
            side: f.side(),
            quantity: f.quantity(),
            price: f.price(),
            notional: f.notional(),
            commission: f.commission(),
            slippage: f.slippage(),
            cash_delta: f.cash_delta(),
        })?;
    }
    if fills.is_empty() {
        wtr.write_record([
            "fill_id",
            "order_id",
            "timestamp",
            "symbol",
            "side",
            "quantity",
            "price",
            "notional",
            "commission",
            "slippage",
            "cash_delta",
        ])?;
    }
    into_string(wtr)
}

/// Export the equity curve as CSV.
///
/// Columns: timestamp, phase, equity, cash, cash_weight, then one
/// `weight_<symbol>` column per symbol ever held, in symbol order.
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String, ExportError> {
    let symbols: BTreeSet<&str> = curve
        .iter()
        .flat_map(|p| p.weights.keys().map(String::as_str))
        .collect();

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec![
        "timestamp".to_string(),
        "phase".to_string(),
        "equity".to_string(),
        "cash".to_string(),
        "cash_weight".to_string(),
    ];
    header.extend(symbols.iter().map(|s| format!("weight_{s}")));
    wtr.write_record(&header)?;

    for point in curve {
        let mut record = vec![
            point.timestamp.to_rfc3339(),
            point.phase.to_string(),
            point.equity.to_string(),
            point.cash.to_string(),
            point.cash_weight().round_dp(6).to_string(),
        ];
        record.extend(symbols.iter().map(|s| point.weight(s).round_dp(6).to_string()));
        wtr.write_record(&record)?;
    }
    into_string(wtr)
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Write `result.json`, `summary.json`, `trades.csv` and `equity.csv` into
/// `output_dir/<run_id prefix>/`. Returns the run directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf, ExportError> {
    let prefix = result.run_id.get(..12).unwrap_or(&result.run_id);
    let dir = output_dir.join(prefix);
    std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
        path: dir.clone(),
        source,
    })?;

    let files = [
        ("result.json", export_json(result)?),
        ("summary.json", export_summary_json(result)?),
        ("trades.csv", export_trades_csv(&result.run.fills)?),
        ("equity.csv", export_equity_csv(&result.run.equity_curve)?),
    ];
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content).map_err(|source| ExportError::Io { path, source })?;
    }

    info!(dir = %dir.display(), "artifacts saved");
    Ok(dir)
}

/// Load a full result previously written by [`save_artifacts`].
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult, ExportError> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path).map_err(|source| ExportError::Io { path, source })?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::data_loader::{generate_synthetic, LoadedData, SyntheticConfig};
    use crate::runner::run_loaded;
    use chrono::NaiveDate;

    fn result() -> BacktestResult {
        let config = BacktestConfig::default();
        let synthetic =
            SyntheticConfig::for_backtest(&config, NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(), 160, 9);
        let data = LoadedData::new(generate_synthetic(&synthetic).unwrap(), true);
        run_loaded(&config, &data).unwrap()
    }

    #[test]
    fn json_round_trip_and_version_guard() {
        let r = result();
        let json = export_json(&r).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run.fills, r.run.fills);

        let mut future = r.clone();
        future.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&future).unwrap();
        assert!(matches!(
            import_json(&json).unwrap_err(),
            ExportError::SchemaVersion { .. }
        ));
    }

    #[test]
    fn trades_csv_has_one_row_per_fill() {
        let r = result();
        let csv = export_trades_csv(&r.run.fills).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("fill_id,order_id,timestamp,symbol,side"));
        assert_eq!(lines.len(), r.run.fills.len() + 1);
        if let Some(first) = lines.get(1) {
            assert!(first.contains("BUY") || first.contains("SELL"));
        }
    }

    #[test]
    fn empty_ledger_still_has_header() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("fill_id,"));
    }

    #[test]
    fn equity_csv_columns() {
        let r = result();
        let csv = export_equity_csv(&r.run.equity_curve).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("timestamp,phase,equity,cash,cash_weight"));
        assert_eq!(lines.count(), r.run.equity_curve.len());
        assert!(csv.contains("WARMUP"));
    }

    #[test]
    fn summary_omits_ledger() {
        let r = result();
        let value: serde_json::Value = serde_json::from_str(&export_summary_json(&r).unwrap()).unwrap();
        assert_eq!(value["run_id"], r.run_id.as_str());
        assert!(value.get("fills").is_none());
        assert!(value["metrics"]["sharpe"].is_number());
    }

    #[test]
    fn artifacts_saved_and_loaded() {
        let r = result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&r, dir.path()).unwrap();
        for name in ["result.json", "summary.json", "trades.csv", "equity.csv"] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.run_id, r.run_id);
        assert_eq!(loaded.metrics.total_return, r.metrics.total_return);
        assert_eq!(loaded.metrics.trade_count, r.metrics.trade_count);
    }
}
