//! Manual price override with a margin floor and audit trail (spec §4.10).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost::{classify_profitability, ProfitabilityThresholds};
use crate::error::{CoreError, CoreResult};
use crate::money::round2;
use crate::pricing::PricingResult;
use crate::rules::AppliedRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideOutcome {
    pub result: PricingResult,
    pub override_applied: bool,
    pub previous_price: Decimal,
}

/// `applyPriceOverride(result, newPrice, reason?, minimumMarginPercent?)`.
///
/// Rejects with `InvalidOverridePrice` when `newPrice <= 0`, or
/// `BelowMinimumMargin` when a floor is configured and violated. Otherwise
/// replaces the price, recomputes margin/indicator, and appends a
/// `ManualOverride` rule.
pub fn apply_price_override(
    mut result: PricingResult,
    new_price: Decimal,
    reason: Option<String>,
    minimum_margin_percent: Option<Decimal>,
    overridden_at: DateTime<Utc>,
    thresholds: &ProfitabilityThresholds,
    is_contract_price_override: bool,
) -> CoreResult<OverrideOutcome> {
    if new_price <= Decimal::ZERO {
        return Err(CoreError::InvalidOverridePrice(format!(
            "newPrice must be positive, got {new_price}"
        )));
    }

    let new_margin = new_price - result.internal_cost;
    let new_margin_percent = crate::cost::margin_percent(new_price, new_margin);

    if let Some(floor) = minimum_margin_percent {
        if new_margin_percent < floor {
            return Err(CoreError::BelowMinimumMargin);
        }
    }

    let previous_price = result.price;
    let price_change = new_price - previous_price;
    let price_change_percent = if previous_price != Decimal::ZERO {
        round2(price_change / previous_price * Decimal::from(100))
    } else {
        Decimal::ZERO
    };

    result.applied_rules.push(AppliedRule::ManualOverride {
        previous_price,
        new_price,
        price_change,
        price_change_percent,
        reason,
        overridden_at,
        is_contract_price_override,
    });

    result.price = new_price;
    result.margin = new_margin;
    result.margin_percent = new_margin_percent;
    result.profitability = classify_profitability(new_margin_percent, thresholds);

    Ok(OverrideOutcome {
        result,
        override_applied: true,
        previous_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{shadow_cost, OrganizationPricingSettings, ProfitabilityIndicator};
    use crate::pricing::{FallbackReason, PricingMode};
    use rust_decimal_macros::dec;

    fn base_result() -> PricingResult {
        let settings = OrganizationPricingSettings::default();
        let shadow = shadow_cost(30.0, 45.0, &settings, None);
        PricingResult {
            mode: PricingMode::Dynamic,
            price: dec!(100),
            internal_cost: shadow.total_internal_cost,
            margin: dec!(100) - shadow.total_internal_cost,
            margin_percent: dec!(50),
            profitability: ProfitabilityIndicator::Green,
            matched_grid_id: None,
            applied_rules: vec![],
            is_contract_price: false,
            fallback_reason: Some(FallbackReason::PrivateClient),
            grid_search_details: None,
            commission: None,
            shadow_cost: shadow,
        }
    }

    #[test]
    fn rejects_non_positive_price() {
        let result = base_result();
        let thresholds = ProfitabilityThresholds::default();
        let err = apply_price_override(result, dec!(0), None, None, Utc::now(), &thresholds, false);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_below_minimum_margin_floor() {
        let result = base_result();
        let thresholds = ProfitabilityThresholds::default();
        let err = apply_price_override(result, dec!(1), None, Some(dec!(10)), Utc::now(), &thresholds, false);
        assert!(matches!(err, Err(CoreError::BelowMinimumMargin)));
    }

    #[test]
    fn accepts_and_records_audit_rule() {
        let result = base_result();
        let thresholds = ProfitabilityThresholds::default();
        let outcome =
            apply_price_override(result, dec!(120), Some("negotiated".into()), None, Utc::now(), &thresholds, false)
                .unwrap();
        assert_eq!(outcome.result.price, dec!(120));
        assert_eq!(outcome.previous_price, dec!(100));
        assert!(outcome.override_applied);
        assert!(matches!(
            outcome.result.applied_rules.last(),
            Some(AppliedRule::ManualOverride { .. })
        ));
    }
}
