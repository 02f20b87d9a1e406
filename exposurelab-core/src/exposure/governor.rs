//! Drawdown governor policies (tier 5).
//!
//! `P_DD` is the compression factor from [`drawdown_compression`]. The
//! policy decides how that factor is applied to the tier-4 exposure.
//!
//! Both policies agree above 1.0 and both return exactly 1.0 at
//! `E_volVIX = 1`, so switching policy never introduces a jump at the
//! neutral point.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::tiers::scale_deviation;

/// How drawdown pressure is applied to the pre-governor exposure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernorPolicy {
    /// `E_raw = 1 + (E_volVIX - 1) * P_DD` on both sides of neutral.
    #[default]
    Symmetric,
    /// Symmetric above neutral. At or below neutral the pressure deepens the
    /// defensive deviation instead of pulling it back to 1.0, stopping at
    /// `floor`.
    Asymmetric { floor: Decimal },
}

impl GovernorPolicy {
    pub fn apply(&self, e_volvix: Decimal, p_dd: Decimal) -> Decimal {
        match *self {
            GovernorPolicy::Symmetric => scale_deviation(e_volvix, p_dd),
            GovernorPolicy::Asymmetric { floor } => {
                if e_volvix > Decimal::ONE {
                    return scale_deviation(e_volvix, p_dd);
                }
                // (2 - P_DD) >= 1 amplifies the distance below neutral.
                let deepened = Decimal::ONE - (Decimal::ONE - e_volvix) * (dec!(2) - p_dd);
                deepened.max(e_volvix.min(floor))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GovernorPolicy::Symmetric => "symmetric",
            GovernorPolicy::Asymmetric { .. } => "asymmetric",
        }
    }
}

/// Tier-5 compression factor from the current drawdown.
///
/// `1` up to `dd_soft`, `p_min` from `dd_hard` on, linear in between.
pub fn drawdown_compression(dd: Decimal, dd_soft: Decimal, dd_hard: Decimal, p_min: Decimal) -> Decimal {
    if dd <= dd_soft {
        Decimal::ONE
    } else if dd >= dd_hard {
        p_min
    } else {
        let progress = (dd - dd_soft) / (dd_hard - dd_soft);
        Decimal::ONE - progress * (Decimal::ONE - p_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_below_soft_threshold() {
        assert_eq!(drawdown_compression(dec!(0.05), dec!(0.10), dec!(0.20), dec!(0)), dec!(1));
    }

    #[test]
    fn compression_midpoint() {
        assert_eq!(drawdown_compression(dec!(0.15), dec!(0.10), dec!(0.20), dec!(0)), dec!(0.5));
    }

    #[test]
    fn compression_beyond_hard_threshold() {
        assert_eq!(drawdown_compression(dec!(0.25), dec!(0.10), dec!(0.20), dec!(0)), dec!(0));
    }

    #[test]
    fn compression_boundaries_are_exact() {
        assert_eq!(drawdown_compression(dec!(0.10), dec!(0.10), dec!(0.20), dec!(0)), dec!(1));
        assert_eq!(drawdown_compression(dec!(0.20), dec!(0.10), dec!(0.20), dec!(0)), dec!(0));
    }

    #[test]
    fn compression_respects_p_min() {
        assert_eq!(drawdown_compression(dec!(0.30), dec!(0.10), dec!(0.20), dec!(0.25)), dec!(0.25));
        // halfway: 1 - 0.5 * 0.75
        assert_eq!(drawdown_compression(dec!(0.15), dec!(0.10), dec!(0.20), dec!(0.25)), dec!(0.625));
    }

    #[test]
    fn symmetric_pulls_toward_neutral() {
        let policy = GovernorPolicy::Symmetric;
        assert_eq!(policy.apply(dec!(1.4), dec!(0.5)), dec!(1.2));
        assert_eq!(policy.apply(dec!(0.6), dec!(0.5)), dec!(0.8));
        assert_eq!(policy.apply(dec!(0.6), dec!(0)), dec!(1));
    }

    #[test]
    fn asymmetric_matches_symmetric_above_neutral() {
        let asym = GovernorPolicy::Asymmetric { floor: dec!(0.25) };
        assert_eq!(asym.apply(dec!(1.4), dec!(0.5)), GovernorPolicy::Symmetric.apply(dec!(1.4), dec!(0.5)));
    }

    #[test]
    fn asymmetric_is_continuous_at_neutral() {
        let asym = GovernorPolicy::Asymmetric { floor: dec!(0.25) };
        for p in [dec!(0), dec!(0.3), dec!(0.5), dec!(1)] {
            assert_eq!(asym.apply(dec!(1), p), dec!(1));
            assert_eq!(GovernorPolicy::Symmetric.apply(dec!(1), p), dec!(1));
        }
    }

    #[test]
    fn asymmetric_deepens_toward_floor() {
        let asym = GovernorPolicy::Asymmetric { floor: dec!(0.25) };
        // 1 - 0.2 * 1.5 = 0.7
        assert_eq!(asym.apply(dec!(0.8), dec!(0.5)), dec!(0.7));
        // 1 - 0.6 * 2 = -0.2, floored
        assert_eq!(asym.apply(dec!(0.4), dec!(0)), dec!(0.25));
    }

    #[test]
    fn asymmetric_without_pressure_is_identity() {
        let asym = GovernorPolicy::Asymmetric { floor: dec!(0.25) };
        assert_eq!(asym.apply(dec!(0.8), dec!(1)), dec!(0.8));
    }

    #[test]
    fn asymmetric_never_raises_input_below_floor() {
        let asym = GovernorPolicy::Asymmetric { floor: dec!(0.25) };
        assert_eq!(asym.apply(dec!(0.1), dec!(0)), dec!(0.1));
    }
}
