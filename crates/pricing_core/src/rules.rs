//! Ordered, audit-quality log of pricing adjustments.
//!
//! Design note §9 asks for "tagged variants over inheritance": each rule
//! variant carries only its own payload, serialized under a `type` field,
//! instead of a class hierarchy of applied-rule components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneMultiplierSource {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentType {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppliedRule {
    ZoneMapping {
        pickup_zone_id: Option<String>,
        dropoff_zone_id: Option<String>,
    },
    ZoneMultiplier {
        zone_id: String,
        multiplier: Decimal,
        source: ZoneMultiplierSource,
        price_before: Decimal,
        price_after: Decimal,
    },
    /// Distance-weighted multiplier across a segmented route, used instead
    /// of `ZoneMultiplier` when a polyline is available (spec §4.4/§4.8).
    RouteSegmentMultiplier {
        weighted_multiplier: Decimal,
        segment_count: usize,
        price_before: Decimal,
        price_after: Decimal,
    },
    AdvancedRate {
        rate_id: String,
        applies_to: String,
        adjustment_type: AdjustmentType,
        value: Decimal,
        price_before: Decimal,
        price_after: Decimal,
    },
    SeasonalMultiplier {
        seasonal_id: String,
        multiplier: Decimal,
        price_before: Decimal,
        price_after: Decimal,
    },
    CatalogPrice {
        price: Decimal,
    },
    PartnerOverridePrice {
        price: Decimal,
    },
    ManualOverride {
        previous_price: Decimal,
        new_price: Decimal,
        price_change: Decimal,
        price_change_percent: Decimal,
        reason: Option<String>,
        overridden_at: chrono::DateTime<chrono::Utc>,
        is_contract_price_override: bool,
    },
    /// Partner commission applied on top of the computed price (spec §4.12).
    Commission {
        commission_percent: Decimal,
        commission_amount: Decimal,
        effective_margin: Decimal,
    },
}
