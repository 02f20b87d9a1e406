//! Baseline-consistency regression.
//!
//! A 150-bar warmup segment climbs from 400.00 to 456.62, then the trading
//! segment runs from 456.78 to 586.19. The reported baseline must start at
//! the first trading bar; starting it at the warmup's first close gives a
//! different, larger number.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use exposurelab_core::domain::Bar;
use exposurelab_core::engine::{baseline_return, run_backtest, EngineConfig};
use exposurelab_core::strategy::BuyAndHoldStrategy;

const WARMUP: usize = 150;
const TRADING: i64 = 50;

fn ts(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 3, 21, 0, 0).unwrap() + Duration::days(i)
}

fn flat_bar(i: i64, close: Decimal) -> Bar {
    Bar::new("SPY", ts(i), close, close, close, close, dec!(0)).unwrap()
}

fn stream() -> Vec<Bar> {
    let warmup = (0..WARMUP as i64).map(|i| flat_bar(i, dec!(400) + dec!(0.38) * Decimal::from(i)));
    let step = (dec!(586.19) - dec!(456.78)) / Decimal::from(TRADING);
    let trading = (0..=TRADING).map(|j| flat_bar(WARMUP as i64 + j, dec!(456.78) + step * Decimal::from(j)));
    warmup.chain(trading).collect()
}

#[test]
fn segment_prices_are_as_described() {
    let bars = stream();
    assert_eq!(bars[0].close(), dec!(400));
    assert_eq!(bars[WARMUP - 1].close(), dec!(456.62));
    assert_eq!(bars[WARMUP].close(), dec!(456.78));
    assert_eq!(bars.last().unwrap().close(), dec!(586.19));
}

#[test]
fn baseline_excludes_warmup() {
    let bars = stream();
    let mut strategy = BuyAndHoldStrategy::new("SPY", WARMUP);
    let result = run_backtest(&bars, &mut strategy, &EngineConfig::default()).unwrap();

    assert_eq!(result.warmup_end, Some(ts(WARMUP as i64)));
    let baseline = result.baseline.unwrap();
    let expected = (dec!(586.19) - dec!(456.78)) / dec!(456.78);
    assert_eq!(baseline.start_price, dec!(456.78));
    assert_eq!(baseline.end_price, dec!(586.19));
    assert_eq!(baseline.total_return, expected);
    assert_eq!(baseline.excluded_bars, WARMUP);
}

#[test]
fn warmup_included_baseline_is_larger() {
    let bars = stream();
    let mut strategy = BuyAndHoldStrategy::new("SPY", WARMUP);
    let result = run_backtest(&bars, &mut strategy, &EngineConfig::default()).unwrap();

    let excluded = result.baseline.unwrap().total_return;
    let included = baseline_return(&bars, "SPY", None).unwrap().total_return;
    assert_eq!(included, (dec!(586.19) - dec!(400)) / dec!(400));
    assert!(excluded < included);
}

#[test]
fn buy_and_hold_tracks_its_baseline() {
    let bars = stream();
    let mut strategy = BuyAndHoldStrategy::new("SPY", WARMUP);
    let result = run_backtest(&bars, &mut strategy, &EngineConfig::default()).unwrap();

    // whole shares leave a little cash idle; nothing else separates the two
    let excess = result.excess_return().unwrap();
    assert!(excess <= dec!(0));
    assert!(excess > dec!(-0.01));
    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].price(), dec!(456.78));
}

#[test]
fn standalone_baseline_matches_direct_computation() {
    let bars = stream();
    let mut strategy = BuyAndHoldStrategy::new("SPY", WARMUP);
    let result = run_backtest(&bars, &mut strategy, &EngineConfig::default()).unwrap();
    let direct = baseline_return(&bars, "SPY", result.warmup_end).unwrap();
    assert_eq!(result.baseline.unwrap(), direct);
}
