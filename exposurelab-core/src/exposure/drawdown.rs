//! Running equity peak and drawdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Peak/drawdown accumulator, updated once per bar.
///
/// The peak starts at the first observed equity and never decreases.
/// Drawdown is `(peak - equity) / peak`, zero at or above the peak.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawdownTracker {
    peak: Option<Decimal>,
    drawdown: Decimal,
    max_drawdown: Decimal,
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the latest equity and return the resulting drawdown.
    pub fn update(&mut self, equity: Decimal) -> Decimal {
        let peak = match self.peak {
            Some(p) if p >= equity => p,
            _ => equity,
        };
        self.peak = Some(peak);
        self.drawdown = if peak > Decimal::ZERO && equity < peak {
            (peak - equity) / peak
        } else {
            Decimal::ZERO
        };
        self.max_drawdown = self.max_drawdown.max(self.drawdown);
        self.drawdown
    }

    pub fn peak(&self) -> Option<Decimal> {
        self.peak
    }

    pub fn drawdown(&self) -> Decimal {
        self.drawdown
    }

    pub fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tracks_peak_and_drawdown() {
        let mut tracker = DrawdownTracker::new();
        let equities = [dec!(100000), dec!(110000), dec!(88000), dec!(105000)];
        let drawdowns: Vec<Decimal> = equities.iter().map(|&e| tracker.update(e)).collect();

        assert_eq!(drawdowns[0], dec!(0));
        assert_eq!(drawdowns[1], dec!(0));
        assert_eq!(drawdowns[2], dec!(0.2));
        // still measured against the 110k peak
        assert_eq!(drawdowns[3], dec!(5000) / dec!(110000));
        assert_eq!(tracker.peak(), Some(dec!(110000)));
        assert_eq!(tracker.max_drawdown(), dec!(0.2));
    }

    #[test]
    fn new_high_resets_drawdown() {
        let mut tracker = DrawdownTracker::new();
        tracker.update(dec!(100));
        tracker.update(dec!(80));
        assert_eq!(tracker.update(dec!(120)), dec!(0));
        assert_eq!(tracker.peak(), Some(dec!(120)));
    }

    #[test]
    fn first_value_initializes_peak() {
        let mut tracker = DrawdownTracker::new();
        assert_eq!(tracker.peak(), None);
        tracker.update(dec!(50));
        assert_eq!(tracker.peak(), Some(dec!(50)));
        assert_eq!(tracker.drawdown(), dec!(0));
    }

    #[test]
    fn reset_clears_state() {
        let mut tracker = DrawdownTracker::new();
        tracker.update(dec!(100));
        tracker.update(dec!(90));
        tracker.reset();
        assert_eq!(tracker, DrawdownTracker::default());
    }
}
