//! Adaptive exposure strategy: Kalman trend, realized volatility and a
//! volatility-index ratio feed the tier pipeline; the resulting exposure is
//! split between a core and a 3x leveraged instrument.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::config::{AdaptiveConfig, StrategyConfigError};
use super::{PortfolioView, Strategy};
use crate::domain::{Bar, Signal, SignalDirection};
use crate::exposure::{
    DrawdownTracker, ExposureBreakdown, ExposureInputs, ExposurePipeline, RebalanceGate, TargetWeights,
};
use crate::indicators::{KalmanTrend, RealizedVolatility, RollingIndicator, Sma};

#[derive(Debug, Clone)]
pub struct AdaptiveExposureStrategy {
    config: AdaptiveConfig,
    name: String,
    pipeline: ExposurePipeline,
    gate: RebalanceGate,
    trend: KalmanTrend,
    vol: RealizedVolatility,
    vix_average: Sma,
    last_vix: Option<Decimal>,
    drawdown: DrawdownTracker,
    primary_bars: usize,
    last_breakdown: Option<ExposureBreakdown>,
    rebalances: usize,
}

impl AdaptiveExposureStrategy {
    pub fn new(config: AdaptiveConfig) -> Result<Self, StrategyConfigError> {
        config.validate()?;
        let pipeline = ExposurePipeline::new(config.exposure.clone())?;
        let gate = RebalanceGate::new(config.exposure.rebalance_threshold)?;
        let trend = KalmanTrend::new(
            config.kalman_process_noise,
            config.kalman_measurement_noise,
            config.kalman_settle_bars,
        )?;
        let vol = RealizedVolatility::new(config.vol_lookback)?;
        let vix_average = Sma::new(config.exposure.vix_period)?;
        let name = format!("adaptive_exposure_{}", config.exposure.governor.name());
        Ok(Self {
            config,
            name,
            pipeline,
            gate,
            trend,
            vol,
            vix_average,
            last_vix: None,
            drawdown: DrawdownTracker::new(),
            primary_bars: 0,
            last_breakdown: None,
            rebalances: 0,
        })
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Tier values from the most recent post-warmup evaluation.
    pub fn last_breakdown(&self) -> Option<&ExposureBreakdown> {
        self.last_breakdown.as_ref()
    }

    pub fn drawdown(&self) -> &DrawdownTracker {
        &self.drawdown
    }

    /// Number of gate firings that produced at least one order.
    pub fn rebalance_count(&self) -> usize {
        self.rebalances
    }

    fn vix_ratio(&self) -> Decimal {
        match (self.last_vix, self.vix_average.value()) {
            (Some(level), Some(average)) if average > Decimal::ZERO => level / average,
            _ => Decimal::ONE,
        }
    }

    fn held_weights(&self, view: &PortfolioView<'_>) -> TargetWeights {
        let core = view.weight(&self.config.core_symbol);
        let leveraged = view.weight(&self.config.leveraged_symbol);
        TargetWeights {
            core,
            leveraged,
            cash: Decimal::ONE - core - leveraged,
        }
    }

    /// Whole-share orders moving the book to `target`. Sells come first so
    /// their proceeds fund the buys.
    fn rebalance_signals(&self, bar: &Bar, view: &PortfolioView<'_>, target: &TargetWeights) -> Vec<Signal> {
        let equity = view.equity();
        if equity <= Decimal::ZERO {
            return Vec::new();
        }
        let legs = [
            (self.config.core_symbol.as_str(), target.core),
            (self.config.leveraged_symbol.as_str(), target.leveraged),
        ];

        let mut sells = Vec::new();
        let mut buys = Vec::new();
        for (symbol, weight) in legs {
            let Some(price) = view.price(symbol).filter(|p| *p > Decimal::ZERO) else {
                if weight > Decimal::ZERO {
                    warn!(symbol, %weight, "no price yet, leg skipped");
                }
                continue;
            };
            let desired = (equity * weight / price).floor();
            let delta = desired - view.quantity(symbol);
            let (direction, quantity, bucket) = if delta > Decimal::ZERO {
                (SignalDirection::Buy, delta, &mut buys)
            } else if delta < Decimal::ZERO {
                (SignalDirection::Sell, -delta, &mut sells)
            } else {
                continue;
            };
            match Signal::new(symbol, direction, bar.timestamp(), quantity) {
                Ok(signal) => bucket.push(signal.with_strategy(&self.name)),
                Err(err) => warn!(%err, "signal rejected"),
            }
        }
        sells.extend(buys);
        sells
    }
}

impl Strategy for AdaptiveExposureStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_symbol(&self) -> &str {
        &self.config.signal_symbol
    }

    fn warmup_bars(&self) -> usize {
        self.config.warmup_bars()
    }

    fn tracked_symbols(&self) -> Vec<String> {
        let mut symbols = vec![self.config.signal_symbol.clone()];
        for s in [&self.config.core_symbol, &self.config.leveraged_symbol] {
            if !symbols.contains(s) {
                symbols.push(s.clone());
            }
        }
        if let Some(vix) = &self.config.vix_symbol {
            symbols.push(vix.clone());
        }
        symbols
    }

    fn on_bar(&mut self, bar: &Bar, view: &PortfolioView<'_>) -> Vec<Signal> {
        if self.config.vix_symbol.as_deref() == Some(bar.symbol()) {
            self.vix_average.update(bar.close());
            self.last_vix = Some(bar.close());
            return Vec::new();
        }
        if bar.symbol() != self.config.signal_symbol {
            return Vec::new();
        }

        self.trend.update(bar.close());
        self.vol.update(bar.close());
        self.drawdown.update(view.equity());
        self.primary_bars += 1;
        if self.primary_bars <= self.warmup_bars() {
            return Vec::new();
        }

        let inputs = ExposureInputs {
            trend_strength: self.trend.value().unwrap_or(Decimal::ZERO),
            realized_vol: self.vol.value().unwrap_or(Decimal::ZERO),
            vix_ratio: self.vix_ratio(),
            drawdown: self.drawdown.drawdown(),
        };
        let breakdown = self.pipeline.evaluate(inputs);
        self.last_breakdown = Some(breakdown);

        let target = TargetWeights::from_exposure(breakdown.exposure);
        let held = self.held_weights(view);
        let decision = self.gate.evaluate(&held, &target);
        if !decision.triggered {
            return Vec::new();
        }
        let signals = self.rebalance_signals(bar, view, &target);
        if signals.is_empty() {
            debug!(timestamp = %bar.timestamp(), "gate fired but no whole-share order");
            return signals;
        }
        debug!(
            timestamp = %bar.timestamp(),
            exposure = %breakdown.exposure,
            distance = %decision.distance,
            orders = signals.len(),
            "rebalance"
        );
        self.rebalances += 1;
        signals
    }

    fn reset(&mut self) {
        self.trend.reset();
        self.vol.reset();
        self.vix_average.reset();
        self.last_vix = None;
        self.drawdown.reset();
        self.primary_bars = 0;
        self.last_breakdown = None;
        self.rebalances = 0;
    }

    fn exposure_breakdown(&self) -> Option<ExposureBreakdown> {
        self.last_breakdown
    }
}
