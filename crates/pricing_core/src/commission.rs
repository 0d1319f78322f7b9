//! Commission: effective margin under a partner commission rate (spec §4.12).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommissionData {
    pub commission_percent: Decimal,
    pub commission_amount: Decimal,
    pub effective_margin: Decimal,
    pub effective_margin_percent: Decimal,
}

/// Returns `None` for a zero commission — the gross margin is used instead
/// (spec §4.12: "a zero commission produces no commission data").
pub fn compute_commission(price: Decimal, cost: Decimal, commission_percent: Decimal) -> Option<CommissionData> {
    if commission_percent == Decimal::ZERO {
        return None;
    }
    let commission_amount = round2(price * commission_percent / Decimal::from(100));
    let effective_margin = price - cost - commission_amount;
    let effective_margin_percent = if price > Decimal::ZERO {
        round2(effective_margin / price * Decimal::from(100))
    } else {
        Decimal::ZERO
    };

    Some(CommissionData {
        commission_percent,
        commission_amount,
        effective_margin,
        effective_margin_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_commission_yields_none() {
        assert!(compute_commission(dec!(100), dec!(50), dec!(0)).is_none());
    }

    #[test]
    fn commission_reduces_effective_margin() {
        let data = compute_commission(dec!(100), dec!(50), dec!(10)).unwrap();
        assert_eq!(data.commission_amount, dec!(10.00));
        assert_eq!(data.effective_margin, dec!(40));
        assert_eq!(data.effective_margin_percent, dec!(40.00));
    }
}
