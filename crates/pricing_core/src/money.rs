//! Fixed-point money handling.
//!
//! All monetary values flow through [`Decimal`] rather than `f64`; rounding
//! happens once, at the boundary where a value is about to be displayed or
//! persisted, never mid-formula (design note §9).

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Round to 2 decimal places, half-up, the convention used throughout the
/// pricing, cost, and invoice engines.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to 3 decimal places, used only for the weighted multiplier (spec §4.4).
pub fn round3(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a plain `f64` distance/duration into a `Decimal` for use in money
/// formulas. Not used for money itself, only for the numeric factors (km, h)
/// that multiply against decimal rates.
pub fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn round3_matches_weighted_multiplier_precision() {
        assert_eq!(round3(dec!(1.23456)), dec!(1.235));
    }
}
