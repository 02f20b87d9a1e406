//! Criterion benchmarks for ExposureLab hot paths.
//!
//! Benchmarks:
//! 1. Tier pipeline evaluation (one bar)
//! 2. Adaptive strategy per-bar step
//! 3. Full event loop over a three-symbol stream

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use exposurelab_core::domain::Bar;
use exposurelab_core::engine::{run_backtest, EngineConfig};
use exposurelab_core::exposure::{ExposureConfig, ExposureInputs, ExposurePipeline};
use exposurelab_core::strategy::{AdaptiveConfig, AdaptiveExposureStrategy, PortfolioView, Strategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_stream(n: i64) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2015, 1, 2, 21, 0, 0).unwrap();
    (0..n)
        .flat_map(|i| {
            let ts = base + Duration::days(i);
            let spy = Decimal::new(20_000 + i * 3 + (i * 37) % 400 - 200, 2);
            let upro = Decimal::new(3_000 + i * 2 + (i * 53) % 300 - 150, 2);
            let vix = Decimal::new(1_500 + (i * 71) % 1_500, 2);
            [("SPY", spy), ("UPRO", upro), ("VIX", vix)].map(|(s, c)| {
                Bar::new(s, ts, c, c + dec!(1), c - dec!(1), c, dec!(1000000)).unwrap()
            })
        })
        .collect()
}

// ── 1. Pipeline ──────────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = ExposurePipeline::new(ExposureConfig::default()).unwrap();
    let inputs = ExposureInputs {
        trend_strength: dec!(23.5),
        realized_vol: dec!(0.17),
        vix_ratio: dec!(1.3),
        drawdown: dec!(0.12),
    };
    c.bench_function("pipeline_evaluate", |b| b.iter(|| pipeline.evaluate(black_box(inputs))));
}

// ── 2. Strategy step ─────────────────────────────────────────────────

fn bench_strategy_step(c: &mut Criterion) {
    let bars = make_stream(300);
    let positions = HashMap::new();
    let prices: HashMap<String, Decimal> = bars[bars.len() - 3..]
        .iter()
        .map(|b| (b.symbol().to_string(), b.close()))
        .collect();
    let view = PortfolioView::new(dec!(100000), dec!(100000), &positions, &prices);

    c.bench_function("adaptive_on_bar_300d", |b| {
        b.iter(|| {
            let mut strategy = AdaptiveExposureStrategy::new(AdaptiveConfig::default()).unwrap();
            for bar in &bars {
                black_box(strategy.on_bar(bar, &view));
            }
        })
    });
}

// ── 3. Event loop ────────────────────────────────────────────────────

fn bench_event_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_backtest");
    for days in [252i64, 1260] {
        let bars = make_stream(days);
        group.bench_with_input(BenchmarkId::from_parameter(days), &bars, |b, bars| {
            b.iter(|| {
                let mut strategy = AdaptiveExposureStrategy::new(AdaptiveConfig::default()).unwrap();
                run_backtest(black_box(bars), &mut strategy, &EngineConfig::default()).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_strategy_step, bench_event_loop);
criterion_main!(benches);
