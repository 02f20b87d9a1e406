//! Performance metrics — pure functions over a finished run.
//!
//! Ratios are computed in `f64` over the trading window (warmup excluded).
//! Return figures that get compared against the baseline stay exact.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exposurelab_core::engine::{EquityPoint, RunResult};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// `final_equity / initial_capital - 1`, exact.
    pub total_return: Decimal,
    pub baseline_return: Option<Decimal>,
    /// Strategy return minus baseline return, exact.
    pub excess_return: Option<Decimal>,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    /// Equity points in the trading window.
    pub trading_days: usize,
    pub trade_count: usize,
    pub total_commission: Decimal,
    pub total_slippage: Decimal,
    /// Mean share of equity held in positions over the trading window.
    pub avg_invested: f64,
}

impl PerformanceMetrics {
    pub fn compute(run: &RunResult) -> Self {
        let active: Vec<&EquityPoint> = run.active_curve().collect();
        let curve: Vec<f64> = active.iter().map(|p| to_f64(p.equity)).collect();
        let trading_days = curve.len();
        Self {
            total_return: run.total_return(),
            baseline_return: run.baseline.as_ref().map(|b| b.total_return),
            excess_return: run.excess_return(),
            cagr: cagr(&curve, trading_days),
            sharpe: sharpe_ratio(&curve, 0.0),
            sortino: sortino_ratio(&curve, 0.0),
            calmar: calmar_ratio(&curve, trading_days),
            max_drawdown: max_drawdown(&curve),
            trading_days,
            trade_count: run.fills.len(),
            total_commission: run.total_commission,
            total_slippage: run.total_slippage,
            avg_invested: average_invested(&active),
        }
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

// ─── Individual metric functions ────────────────────────────────────

/// Compound Annual Growth Rate.
///
/// Assumes 252 trading days per year. Returns 0.0 for single-bar or constant equity.
pub fn cagr(equity_curve: &[f64], trading_days: usize) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || trading_days < 2 || initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from daily returns.
///
/// Sharpe = mean(daily returns - rf) / std(daily returns) * sqrt(252).
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let excess = excess_returns(equity_curve, risk_free_rate);
    if excess.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 with no losing days or fewer than 2 returns.
pub fn sortino_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let excess = excess_returns(equity_curve, risk_free_rate);
    if excess.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / excess.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
///
/// Returns 0.0 if max drawdown is zero or CAGR is non-positive.
pub fn calmar_ratio(equity_curve: &[f64], trading_days: usize) -> f64 {
    let c = cagr(equity_curve, trading_days);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Mean of `1 - cash weight` across the given points.
pub fn average_invested(points: &[&EquityPoint]) -> f64 {
    let invested: Vec<f64> = points.iter().map(|p| to_f64(Decimal::ONE - p.cash_weight())).collect();
    mean_f64(&invested)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Compute daily returns from an equity curve.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn excess_returns(equity_curve: &[f64], risk_free_rate: f64) -> Vec<f64> {
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    daily_returns(equity_curve).into_iter().map(|r| r - daily_rf).collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    #[test]
    fn cagr_one_year_doubling() {
        let mut curve = vec![100.0; 252];
        curve[251] = 200.0;
        assert!((cagr(&curve, 252) - 1.0).abs() < EPS);
        assert_eq!(cagr(&[100.0], 1), 0.0);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        assert_eq!(sharpe_ratio(&[100.0; 20], 0.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_noisy_uptrend() {
        let curve: Vec<f64> = (0..100)
            .map(|i| 100.0 * (1.0 + 0.001 * i as f64) + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        assert!(sharpe_ratio(&curve, 0.0) > 0.0);
    }

    #[test]
    fn sortino_zero_without_losses() {
        let curve = [100.0, 101.0, 102.0, 103.0];
        assert_eq!(sortino_ratio(&curve, 0.0), 0.0);
        assert!(sortino_ratio(&[100.0, 105.0, 103.0, 110.0], 0.0) > 0.0);
    }

    #[test]
    fn max_drawdown_negative_fraction() {
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert!((dd - (-0.25)).abs() < EPS);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn calmar_uses_drawdown_magnitude() {
        let curve = [100.0, 120.0, 90.0, 130.0];
        let expected = cagr(&curve, 4) / 0.25;
        assert!((calmar_ratio(&curve, 4) - expected).abs() < EPS);
        assert_eq!(calmar_ratio(&[100.0, 90.0, 80.0], 3), 0.0);
    }

    #[test]
    fn daily_returns_skip_nonpositive_base() {
        let r = daily_returns(&[100.0, 110.0, 0.0, 5.0]);
        assert!((r[0] - 0.1).abs() < EPS);
        assert_eq!(r[2], 0.0);
    }

    #[test]
    fn std_dev_is_sample_deviation() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - (32.0_f64 / 7.0).sqrt()).abs() < EPS);
    }
}
