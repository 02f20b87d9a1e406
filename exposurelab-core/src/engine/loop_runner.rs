//! Bar-by-bar event loop.
//!
//! The stream is processed one timestamp at a time:
//! 1. Mark: record every bar's close as the latest price
//! 2. Phase: count primary bars, flip WARMUP → ACTIVE past the warmup
//! 3. Decide: feed bars to the strategy, primary bars last so the strategy
//!    decides with every other symbol already updated
//! 4. Execute: signals → orders → fills at this timestamp's bars
//! 5. Record: equity and weights after all fills
//!
//! At stream end the run is FINALIZED and the baseline is computed over the
//! warmup-excluded window.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::baseline::baseline_return;
use super::error::EngineError;
use super::phase::RunPhase;
use super::simulator::ExecutionSimulator;
use super::state::{EngineConfig, EngineState, RunResult};
use crate::domain::{Bar, Order, Signal};
use crate::strategy::{PortfolioView, Strategy};

/// Run `strategy` over a merged, timestamp-ordered bar stream.
///
/// The strategy is reset first, so a run never sees state left over from a
/// previous one.
pub fn run_backtest(bars: &[Bar], strategy: &mut dyn Strategy, config: &EngineConfig) -> Result<RunResult, EngineError> {
    config.validate()?;
    validate_stream(bars)?;

    let baseline_symbol = config
        .baseline_symbol
        .clone()
        .unwrap_or_else(|| strategy.primary_symbol().to_string());
    if !bars.iter().any(|b| b.symbol() == baseline_symbol) {
        return Err(EngineError::UnknownBaselineSymbol(baseline_symbol));
    }

    strategy.reset();
    let tracked: HashSet<String> = strategy.tracked_symbols().into_iter().collect();
    let primary = strategy.primary_symbol().to_string();
    let simulator = ExecutionSimulator::new(config.execution.clone());
    let mut state = EngineState::new(config.initial_capital, strategy.warmup_bars());

    info!(
        strategy = strategy.name(),
        bars = bars.len(),
        warmup_bars = strategy.warmup_bars(),
        "backtest started"
    );

    let mut start = 0;
    while start < bars.len() {
        let timestamp = bars[start].timestamp();
        let len = bars[start..]
            .iter()
            .take_while(|b| b.timestamp() == timestamp)
            .count();
        let slice = &bars[start..start + len];
        process_timestamp(slice, &primary, &tracked, strategy, &simulator, &mut state)?;
        start += len;
    }

    state.phase.finalize();
    if state.phase.warmup_incomplete() {
        warn!(
            primary_bars = state.phase.primary_bars(),
            warmup_bars = state.phase.warmup_bars(),
            "stream ended during warmup, no trading window"
        );
    }
    let baseline = if state.phase.warmup_incomplete() {
        None
    } else {
        baseline_return(bars, &baseline_symbol, state.phase.warmup_end())
    };

    let final_equity = state.equity();
    info!(
        phase = %RunPhase::Finalized,
        %final_equity,
        fills = state.fills.len(),
        baseline = ?baseline.as_ref().map(|b| b.total_return),
        "backtest finished"
    );

    Ok(RunResult {
        strategy: strategy.name().to_string(),
        phase: state.phase.phase(),
        initial_capital: config.initial_capital,
        final_equity,
        warmup_end: state.phase.warmup_end(),
        warmup_bars: state.phase.warmup_bars(),
        bar_count: state.bar_count,
        primary_bar_count: state.phase.primary_bars(),
        signal_count: state.signal_count,
        warmup_signals: state.warmup_signals,
        unfilled_signals: state.unfilled_signals,
        total_commission: state.portfolio.total_commission,
        total_slippage: state.portfolio.total_slippage,
        realized_pnl: state.portfolio.realized_pnl,
        baseline,
        last_breakdown: strategy.exposure_breakdown(),
        fills: state.fills,
        equity_curve: state.equity_curve,
    })
}

/// Non-empty and non-decreasing in time.
fn validate_stream(bars: &[Bar]) -> Result<(), EngineError> {
    if bars.is_empty() {
        return Err(EngineError::NoBars);
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp() < pair[0].timestamp() {
            return Err(EngineError::OutOfOrder {
                index: i + 1,
                symbol: pair[1].symbol().to_string(),
                previous: pair[0].timestamp(),
                current: pair[1].timestamp(),
            });
        }
    }
    Ok(())
}

fn process_timestamp(
    slice: &[Bar],
    primary: &str,
    tracked: &HashSet<String>,
    strategy: &mut dyn Strategy,
    simulator: &ExecutionSimulator,
    state: &mut EngineState,
) -> Result<(), EngineError> {
    let timestamp = slice[0].timestamp();

    // ─── Mark ───
    for bar in slice {
        state.last_close.insert(bar.symbol().to_string(), bar.close());
    }
    state.bar_count += slice.len();

    // ─── Phase ───
    for _ in slice.iter().filter(|b| b.symbol() == primary) {
        if state.phase.on_primary_bar(timestamp) {
            info!(%timestamp, from = %RunPhase::Warmup, to = %RunPhase::Active, "warmup complete");
        }
    }

    // ─── Decide + execute ───
    let ordered = slice
        .iter()
        .filter(|b| b.symbol() != primary)
        .chain(slice.iter().filter(|b| b.symbol() == primary));
    for bar in ordered {
        if !tracked.contains(bar.symbol()) {
            continue;
        }
        let signals = {
            let view = PortfolioView::new(
                state.portfolio.cash,
                state.equity(),
                &state.portfolio.positions,
                &state.last_close,
            );
            strategy.on_bar(bar, &view)
        };
        if !state.phase.is_active() {
            if !signals.is_empty() {
                debug!(count = signals.len(), %timestamp, "signals discarded during warmup");
                state.warmup_signals += signals.len();
            }
            continue;
        }
        state.signal_count += signals.len();
        for signal in &signals {
            execute_signal(signal, slice, simulator, state)?;
        }
    }

    // ─── Record ───
    state.record_equity(timestamp);
    Ok(())
}

fn execute_signal(
    signal: &Signal,
    slice: &[Bar],
    simulator: &ExecutionSimulator,
    state: &mut EngineState,
) -> Result<(), EngineError> {
    let Some(bar) = slice.iter().find(|b| b.symbol() == signal.symbol()) else {
        warn!(symbol = signal.symbol(), timestamp = %signal.timestamp(), "no bar to fill on, signal dropped");
        state.unfilled_signals += 1;
        return Ok(());
    };

    let held = state.portfolio.quantity(signal.symbol());
    let Some(order) = Order::from_signal(state.ids.next_order_id(), signal, held)? else {
        debug!(symbol = signal.symbol(), "nothing to sell, signal dropped");
        state.unfilled_signals += 1;
        return Ok(());
    };

    match simulator.execute(&order, bar, state.portfolio.cash, &mut state.ids)? {
        Some(fill) => {
            debug!(
                fill = %fill.id(),
                symbol = fill.symbol(),
                side = ?fill.side(),
                quantity = %fill.quantity(),
                price = %fill.price(),
                "filled"
            );
            state.portfolio.apply_fill(&fill);
            state.fills.push(fill);
        }
        None => state.unfilled_signals += 1,
    }
    Ok(())
}
