//! Buy-and-hold baseline over the strategy's trading window.
//!
//! Only bars at or after the warmup end count. Starting the baseline inside
//! the warmup period compares the strategy against a window it never
//! traded, and batch runs would then disagree with standalone runs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineReport {
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_price: Decimal,
    pub end_price: Decimal,
    /// `(end_price - start_price) / start_price`, exact.
    pub total_return: Decimal,
    /// Baseline-symbol bars inside the window.
    pub bars: usize,
    /// Baseline-symbol bars dropped because they precede the warmup end.
    pub excluded_bars: usize,
}

/// Buy-and-hold return of `symbol` from the first eligible close to the last.
///
/// `warmup_end = None` makes every bar eligible. Returns `None` when no
/// eligible bar exists or the starting close is not positive.
pub fn baseline_return(bars: &[Bar], symbol: &str, warmup_end: Option<DateTime<Utc>>) -> Option<BaselineReport> {
    let mut first: Option<&Bar> = None;
    let mut last: Option<&Bar> = None;
    let mut count = 0;
    let mut excluded = 0;

    for bar in bars.iter().filter(|b| b.symbol() == symbol) {
        if warmup_end.is_some_and(|end| bar.timestamp() < end) {
            excluded += 1;
            continue;
        }
        first.get_or_insert(bar);
        last = Some(bar);
        count += 1;
    }

    let (first, last) = (first?, last?);
    if first.close() <= Decimal::ZERO {
        return None;
    }
    Some(BaselineReport {
        symbol: symbol.to_string(),
        start: first.timestamp(),
        end: last.timestamp(),
        start_price: first.close(),
        end_price: last.close(),
        total_return: (last.close() - first.close()) / first.close(),
        bars: count,
        excluded_bars: excluded,
    })
}
