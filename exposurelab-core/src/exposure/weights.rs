//! Two-instrument mapping from target exposure to portfolio weights.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Exposure of one unit of weight in the leveraged instrument.
pub const LEVERAGE_MULTIPLE: Decimal = dec!(3);

/// Weights across the core instrument, the 3x leveraged instrument and cash.
///
/// Always sums to 1. Effective exposure is `core + 3 * leveraged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWeights {
    pub core: Decimal,
    pub leveraged: Decimal,
    pub cash: Decimal,
}

impl Default for TargetWeights {
    /// All cash.
    fn default() -> Self {
        Self {
            core: Decimal::ZERO,
            leveraged: Decimal::ZERO,
            cash: Decimal::ONE,
        }
    }
}

impl TargetWeights {
    /// Map exposure `E_t` to weights.
    ///
    /// Up to 1.0 the remainder sits in cash; above 1.0 the leveraged sleeve
    /// takes `(E_t - 1) / 2` and the core instrument the rest.
    pub fn from_exposure(exposure: Decimal) -> Self {
        if exposure <= Decimal::ONE {
            Self {
                core: exposure,
                leveraged: Decimal::ZERO,
                cash: Decimal::ONE - exposure,
            }
        } else {
            let leveraged = (exposure - Decimal::ONE) / (LEVERAGE_MULTIPLE - Decimal::ONE);
            Self {
                core: Decimal::ONE - leveraged,
                leveraged,
                cash: Decimal::ZERO,
            }
        }
    }

    /// `core * 1 + leveraged * 3`.
    pub fn effective_exposure(&self) -> Decimal {
        self.core + self.leveraged * LEVERAGE_MULTIPLE
    }

    /// Sum of absolute per-instrument differences. Cash is implied by the
    /// instruments and is not counted twice.
    pub fn l1_distance(&self, other: &TargetWeights) -> Decimal {
        (self.core - other.core).abs() + (self.leveraged - other.leveraged).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leveraged_mapping_above_one() {
        let w = TargetWeights::from_exposure(dec!(1.3));
        assert_eq!(w.leveraged, dec!(0.15));
        assert_eq!(w.core, dec!(0.85));
        assert_eq!(w.cash, dec!(0));
        assert_eq!(w.core * dec!(1) + w.leveraged * dec!(3), dec!(1.3));
    }

    #[test]
    fn cash_mapping_below_one() {
        let w = TargetWeights::from_exposure(dec!(0.7));
        assert_eq!(w.core, dec!(0.7));
        assert_eq!(w.leveraged, dec!(0));
        assert_eq!(w.cash, dec!(0.3));
    }

    #[test]
    fn neutral_is_fully_core() {
        let w = TargetWeights::from_exposure(dec!(1));
        assert_eq!(w.core, dec!(1));
        assert_eq!(w.leveraged, dec!(0));
        assert_eq!(w.cash, dec!(0));
    }

    #[test]
    fn weights_sum_to_one() {
        for e in [dec!(0), dec!(0.25), dec!(1), dec!(1.5), dec!(2.2), dec!(3)] {
            let w = TargetWeights::from_exposure(e);
            assert_eq!(w.core + w.leveraged + w.cash, dec!(1));
            assert_eq!(w.effective_exposure(), e);
        }
    }

    #[test]
    fn l1_distance_over_instruments() {
        let a = TargetWeights::from_exposure(dec!(1.3));
        let b = TargetWeights::from_exposure(dec!(0.7));
        // |0.85 - 0.7| + |0.15 - 0|
        assert_eq!(a.l1_distance(&b), dec!(0.3));
        assert_eq!(a.l1_distance(&a), dec!(0));
    }
}
