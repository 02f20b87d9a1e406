//! Invalid inputs fail loudly with a typed error instead of running.

use std::path::PathBuf;

use exposurelab_runner::config::{BacktestConfig, ConfigError};
use exposurelab_runner::data_loader::LoadError;
use exposurelab_runner::runner::{run_single_backtest, RunError};
use exposurelab_runner::walk_forward::{run_walk_forward, WalkForwardError};
use exposurelab_runner::{GridSearch, LoadedData};

#[test]
fn unknown_table_is_a_parse_error() {
    let err = BacktestConfig::from_toml("[strategyy]\nsignal_symbol = \"SPY\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn duplicate_roles_rejected() {
    let err = BacktestConfig::from_toml("[strategy]\nleveraged_symbol = \"SPY\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Strategy(_)));
}

#[test]
fn missing_config_file() {
    let err = BacktestConfig::from_file(&PathBuf::from("/nonexistent/exposurelab.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn missing_data_file() {
    let mut config = BacktestConfig::default();
    config.backtest.data_files = vec![PathBuf::from("/nonexistent/spy.csv")];
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(err, RunError::Data(LoadError::Io { .. })));
}

#[test]
fn missing_required_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spy.csv");
    std::fs::write(
        &path,
        "symbol,timestamp,open,high,low,close,volume\nSPY,2024-01-02,10,11,9,10.5,100\n",
    )
    .unwrap();
    let mut config = BacktestConfig::default();
    config.backtest.data_files = vec![path];
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(
        err,
        RunError::Data(LoadError::MissingSymbol { ref symbol }) if symbol == "UPRO"
    ));
}

#[test]
fn malformed_row_reports_row_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spy.csv");
    std::fs::write(
        &path,
        "symbol,timestamp,open,high,low,close,volume\n\
         SPY,2024-01-02,10,11,9,10.5,100\n\
         SPY,2024-01-03,10,11,9,10.5,-5\n",
    )
    .unwrap();
    let mut config = BacktestConfig::default();
    config.backtest.data_files = vec![path];
    match run_single_backtest(&config).unwrap_err() {
        RunError::Data(LoadError::InvalidBar { row, .. }) => assert_eq!(row, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn walk_forward_without_enough_bars() {
    let config = BacktestConfig::default();
    let data = LoadedData::new(Vec::new(), true);
    let err = run_walk_forward(&config, &data, &GridSearch::new()).unwrap_err();
    assert!(matches!(err, WalkForwardError::InsufficientData { primary_bars: 0, .. }));
}
