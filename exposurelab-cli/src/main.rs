//! ExposureLab CLI — backtest, grid search, walk-forward and synthetic data.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file and save artifacts
//! - `grid` — sweep the config's `[grid]` table and rank cells by Sharpe
//! - `walk-forward` — rolling train/test validation per `[walk_forward]`
//! - `synthetic` — write a seeded synthetic universe as CSV files
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to change the
//! level (default `info`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use exposurelab_runner::data_loader::{generate_synthetic, load_bars, write_csv, LoadedData, SyntheticConfig};
use exposurelab_runner::grid_search::GridSearch;
use exposurelab_runner::runner::run_loaded;
use exposurelab_runner::walk_forward::run_walk_forward;
use exposurelab_runner::{save_artifacts, BacktestConfig, BacktestResult, StatusContext};

#[derive(Parser)]
#[command(name = "exposurelab", about = "ExposureLab CLI — adaptive leveraged-exposure backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run on this many days of synthetic data instead of the config's files.
    #[arg(long)]
    synthetic_days: Option<usize>,

    /// Seed for synthetic data.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First synthetic date (YYYY-MM-DD).
    #[arg(long, default_value = "2015-01-01")]
    synthetic_start: NaiveDate,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Run every cell of the config's parameter grid.
    Grid {
        #[command(flatten)]
        data: DataArgs,

        /// Run cells one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of ranked cells to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Rolling train/test validation.
    WalkForward {
        #[command(flatten)]
        data: DataArgs,

        /// Optimize each window's parameters over its train window.
        #[arg(long, default_value_t = false)]
        optimize: bool,
    },
    /// Write a synthetic universe as one CSV file per symbol.
    Synthetic {
        /// Config whose instruments the universe should match.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 1260)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "2015-01-01")]
        start: NaiveDate,

        #[arg(long, default_value = "data")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut status = StatusContext::new();

    let outcome = match cli.command {
        Commands::Run {
            data,
            output_dir,
            no_save,
        } => run_cmd(&data, &output_dir, no_save, &mut status),
        Commands::Grid { data, sequential, top } => grid_cmd(&data, sequential, top, &mut status),
        Commands::WalkForward { data, optimize } => walk_forward_cmd(&data, optimize, &mut status),
        Commands::Synthetic {
            config,
            days,
            seed,
            start,
            output_dir,
        } => synthetic_cmd(config.as_deref(), days, seed, start, &output_dir),
    };

    finish(&mut status, &outcome);
    let snapshot = status.snapshot();
    info!(runs = snapshot.runs_completed, transitions = snapshot.transitions, "exiting");
    outcome
}

/// Record why the command failed (if it did), then enter shutdown.
fn finish(status: &mut StatusContext, outcome: &Result<()>) {
    if let Err(e) = outcome {
        if let Err(status_err) = status.mark_degraded(format!("{e:#}")) {
            warn!(%status_err, "could not record failure in status");
        }
    }
    status.begin_shutdown();
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

/// Config plus the bars it runs on. Marks the process ready once both exist.
fn prepare(args: &DataArgs, status: &mut StatusContext) -> Result<(BacktestConfig, LoadedData)> {
    let config = load_config(args.config.as_deref())?;
    let data = match args.synthetic_days {
        Some(days) => {
            let synthetic = SyntheticConfig::for_backtest(&config, args.synthetic_start, days, args.seed);
            let bars = generate_synthetic(&synthetic)?;
            LoadedData::new(bars, true)
        }
        None => load_bars(&config)?,
    };
    if data.synthetic {
        warn!("results are based on SYNTHETIC data");
        status.mark_degraded("synthetic data")?;
    } else {
        status.mark_ready()?;
    }
    Ok((config, data))
}

fn run_cmd(args: &DataArgs, output_dir: &Path, no_save: bool, status: &mut StatusContext) -> Result<()> {
    let (config, data) = prepare(args, status)?;
    let result = run_loaded(&config, &data)?;
    status.record_run()?;
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn grid_cmd(args: &DataArgs, sequential: bool, top: usize, status: &mut StatusContext) -> Result<()> {
    let (config, data) = prepare(args, status)?;
    let results = GridSearch::new().with_parallelism(!sequential).run(
        &config.grid,
        &config,
        &data.bars,
        &data.dataset_hash,
        data.synthetic,
    )?;
    status.record_run()?;

    println!();
    println!("=== Grid Search ({} cells) ===", results.len());
    println!(
        "{:>4}  {:>7} {:>6} {:>8} {:>9}  {:>8} {:>9} {:>8} {:>7}",
        "rank", "k_trend", "t_max", "sigma", "rebal", "sharpe", "return", "max_dd", "trades"
    );
    for (rank, cell) in results.top_n(top).iter().enumerate() {
        let m = &cell.result.metrics;
        println!(
            "{:>4}  {:>7} {:>6} {:>8} {:>9}  {:>8.3} {:>8.2}% {:>7.2}% {:>7}",
            rank + 1,
            cell.params.k_trend,
            cell.params.t_max,
            cell.params.sigma_target,
            cell.params.rebalance_threshold,
            m.sharpe,
            pct(m.total_return),
            m.max_drawdown * 100.0,
            m.trade_count
        );
    }
    if let Some(baseline) = results.best().and_then(|c| c.result.metrics.baseline_return) {
        println!("Baseline (buy-and-hold, warmup excluded): {:.2}%", pct(baseline));
    }
    Ok(())
}

fn walk_forward_cmd(args: &DataArgs, optimize: bool, status: &mut StatusContext) -> Result<()> {
    let (mut config, data) = prepare(args, status)?;
    config.walk_forward.optimize |= optimize;
    let result = run_walk_forward(&config, &data, &GridSearch::new())?;
    status.record_run()?;

    println!();
    println!("=== Walk-Forward ({} windows) ===", result.windows.len());
    for w in &result.windows {
        let baseline = w
            .test_baseline
            .as_ref()
            .map(|b| format!("{:.2}%", pct(b.total_return)))
            .unwrap_or_else(|| "n/a".into());
        println!(
            "#{:<3} test {} .. {}  train sharpe {:>7.3}  test sharpe {:>7.3}  test return {:>7.2}%  baseline {}",
            w.spec.index,
            w.test_period.0.date_naive(),
            w.test_period.1.date_naive(),
            w.train.sharpe,
            w.test.sharpe,
            pct(w.test.total_return),
            baseline
        );
    }
    println!();
    println!("Mean train Sharpe: {:.3}", result.mean_train_sharpe);
    println!("Mean test Sharpe:  {:.3}", result.mean_test_sharpe);
    match result.degradation_ratio {
        Some(ratio) => println!("Degradation:       {ratio:.3} ({:?})", result.degradation_flag),
        None => println!("Degradation:       n/a ({:?})", result.degradation_flag),
    }
    println!("Chained test return: {:.2}%", pct(result.chained_test_return));
    Ok(())
}

fn synthetic_cmd(config: Option<&Path>, days: usize, seed: u64, start: NaiveDate, output_dir: &Path) -> Result<()> {
    let config = load_config(config)?;
    let synthetic = SyntheticConfig::for_backtest(&config, start, days, seed);
    let bars = generate_synthetic(&synthetic)?;

    std::fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    for symbol in config.required_symbols() {
        let symbol_bars: Vec<_> = bars.iter().filter(|b| b.symbol() == symbol).cloned().collect();
        let path = output_dir.join(format!("{}.csv", symbol.to_lowercase()));
        write_csv(&path, &symbol_bars)?;
        println!("{symbol}: {} bars -> {}", symbol_bars.len(), path.display());
    }
    Ok(())
}

fn pct(value: rust_decimal::Decimal) -> rust_decimal::Decimal {
    (value * rust_decimal::Decimal::ONE_HUNDRED).round_dp(2)
}

fn print_summary(result: &BacktestResult) {
    let run = &result.run;
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", run.strategy);
    println!("Run id:         {}", result.run_id);
    if let (Some(first), Some(last)) = (run.equity_curve.first(), run.equity_curve.last()) {
        println!(
            "Period:         {} to {}",
            first.timestamp.date_naive(),
            last.timestamp.date_naive()
        );
    }
    match run.warmup_end {
        Some(end) => println!("Trading from:   {} ({} warmup bars)", end.date_naive(), run.warmup_bars),
        None => println!("Trading from:   never (warmup incomplete)"),
    }
    println!("Bars:           {}", run.bar_count);
    println!("Signals:        {}", run.signal_count);
    println!("Rebalances:     {}", result.rebalance_count);
    println!("Fills:          {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {}", run.final_equity.round_dp(2));
    println!("Total Return:   {:.2}%", pct(m.total_return));
    if let Some(baseline) = &run.baseline {
        println!(
            "Baseline:       {:.2}% ({} {} -> {})",
            pct(baseline.total_return),
            baseline.symbol,
            baseline.start_price,
            baseline.end_price
        );
    }
    if let Some(excess) = m.excess_return {
        println!("Excess Return:  {:.2}%", pct(excess));
    }
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Avg Invested:   {:.1}%", m.avg_invested * 100.0);
    println!("Commission:     {}", m.total_commission.round_dp(2));
    println!("Slippage:       {}", m.total_slippage.round_dp(2));
    if let Some(breakdown) = &run.last_breakdown {
        println!();
        println!("--- Last Exposure Decision ---");
        println!("Trend (bps/bar): {}", breakdown.inputs.trend_strength.round_dp(2));
        println!("Exposure:        {}", breakdown.exposure.round_dp(4));
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
