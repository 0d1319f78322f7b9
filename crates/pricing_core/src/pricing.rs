//! Pricing engine: orchestrates zone classification, grid matching, rate
//! evaluation, and cost computation into a single `PricingResult` (spec
//! §4.8–§4.9).
//!
//! A single call returns a fully formed result: the layered dynamic/
//! fixed-grid algorithm, generalized from a flat `base_fare + distance *
//! rate` formula into the multi-stage pipeline below.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::commission::{compute_commission, CommissionData};
use crate::cost::{classify_profitability, shadow_cost, OrganizationPricingSettings, ProfitabilityIndicator, ShadowCost};
use crate::error::{CoreError, CoreResult};
use crate::geo::GeoPoint;
use crate::grid::{match_grid, GridMiss, GridMissReason, GridSearchDetails};
use crate::model::{Contact, TripType, VehicleCategory};
use crate::rates::{apply_advanced_rates, apply_seasonal_multipliers, AdvancedRate, SeasonalMultiplier};
use crate::rules::{AppliedRule, ZoneMultiplierSource};
use crate::segment::{segment_route, RouteSegmentation};
use crate::zone::{ConflictStrategy, PricingZoneSet, Zone};

pub const DEFAULT_DISTANCE_KM: f64 = 30.0;
pub const DEFAULT_DURATION_MINUTES: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    FixedGrid,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackReason {
    PrivateClient,
    NoContract,
    NoZoneMatch,
    NoRouteMatch,
    NoExcursionMatch,
    NoDispoMatch,
}

impl From<GridMissReason> for FallbackReason {
    fn from(reason: GridMissReason) -> Self {
        match reason {
            GridMissReason::NoZoneMatch => FallbackReason::NoZoneMatch,
            GridMissReason::NoRouteMatch => FallbackReason::NoRouteMatch,
            GridMissReason::NoExcursionMatch => FallbackReason::NoExcursionMatch,
            GridMissReason::NoDispoMatch => FallbackReason::NoDispoMatch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    pub contact_id: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub vehicle_category_id: String,
    pub trip_type: TripType,
    pub pickup_at: Option<NaiveDateTime>,
    pub estimated_distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<f64>,
    /// Encoded route geometry; when present, dynamic pricing weights the
    /// zone multiplier by the distance each zone contributes along the
    /// actual route instead of just `max(pickupZone, dropoffZone)` (spec
    /// §4.4/§4.8).
    pub route_polyline: Option<String>,
}

pub struct PricingEngineContext<'a> {
    pub contact: &'a Contact,
    pub vehicle_category: &'a VehicleCategory,
    pub zones: &'a PricingZoneSet,
    pub zone_conflict_strategy: Option<ConflictStrategy>,
    pub settings: &'a OrganizationPricingSettings,
    pub advanced_rates: &'a [AdvancedRate],
    pub seasonal_multipliers: &'a [SeasonalMultiplier],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingResult {
    pub mode: PricingMode,
    pub price: Decimal,
    pub internal_cost: Decimal,
    pub margin: Decimal,
    pub margin_percent: Decimal,
    pub profitability: ProfitabilityIndicator,
    pub matched_grid_id: Option<String>,
    pub applied_rules: Vec<AppliedRule>,
    pub is_contract_price: bool,
    pub fallback_reason: Option<FallbackReason>,
    /// What the grid matcher checked and rejected. `None` when the grid
    /// wasn't attempted at all (private client or partner with no
    /// contract); `Some` on both a grid hit and a grid miss (spec §3).
    pub grid_search_details: Option<GridSearchDetails>,
    /// Effective margin under the partner's commission rate, when the
    /// matched contract carries a nonzero `commissionPercent` (spec §4.12).
    pub commission: Option<CommissionData>,
    pub shadow_cost: ShadowCost,
}

fn resolve_trip_inputs(request: &PricingRequest) -> (f64, f64) {
    (
        request.estimated_distance_km.unwrap_or(DEFAULT_DISTANCE_KM),
        request.estimated_duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
    )
}

/// `multiplier = max(pickupZone.priceMultiplier, dropoffZone.priceMultiplier)`,
/// applied once, before rates (spec §4.6).
fn zone_multiplier_rule(
    pickup_zone: Option<&Zone>,
    dropoff_zone: Option<&Zone>,
    price: Decimal,
) -> (Decimal, Option<AppliedRule>) {
    let pickup_mult = pickup_zone.map(|z| z.effective_multiplier()).unwrap_or(1.0);
    let dropoff_mult = dropoff_zone.map(|z| z.effective_multiplier()).unwrap_or(1.0);
    let (multiplier, source, zone) = if dropoff_mult > pickup_mult {
        (dropoff_mult, ZoneMultiplierSource::Dropoff, dropoff_zone)
    } else {
        (pickup_mult, ZoneMultiplierSource::Pickup, pickup_zone)
    };

    if multiplier == 1.0 {
        return (price, None);
    }
    let Some(zone) = zone else { return (price, None) };

    let price_after = crate::money::round2(price * crate::money::decimal_from_f64(multiplier));
    (
        price_after,
        Some(AppliedRule::ZoneMultiplier {
            zone_id: zone.id.clone(),
            multiplier: crate::money::decimal_from_f64(multiplier),
            source,
            price_before: price,
            price_after,
        }),
    )
}

#[allow(clippy::too_many_arguments)]
fn finalize_with_cost(
    mode: PricingMode,
    price: Decimal,
    mut applied_rules: Vec<AppliedRule>,
    matched_grid_id: Option<String>,
    is_contract_price: bool,
    fallback_reason: Option<FallbackReason>,
    grid_search_details: Option<GridSearchDetails>,
    commission_percent: Option<Decimal>,
    distance_km: f64,
    duration_minutes: f64,
    settings: &OrganizationPricingSettings,
) -> PricingResult {
    let shadow = shadow_cost(distance_km, duration_minutes, settings, None);
    let gross_margin = price - shadow.total_internal_cost;

    let commission = commission_percent.and_then(|pct| compute_commission(price, shadow.total_internal_cost, pct));
    let (margin, margin_percent) = match &commission {
        Some(data) => (data.effective_margin, data.effective_margin_percent),
        None => (gross_margin, crate::cost::margin_percent(price, gross_margin)),
    };
    if let Some(data) = &commission {
        applied_rules.push(AppliedRule::Commission {
            commission_percent: data.commission_percent,
            commission_amount: data.commission_amount,
            effective_margin: data.effective_margin,
        });
    }
    let profitability = classify_profitability(margin_percent, &settings.profitability_thresholds);

    PricingResult {
        mode,
        price,
        internal_cost: shadow.total_internal_cost,
        margin,
        margin_percent,
        profitability,
        matched_grid_id,
        applied_rules,
        is_contract_price,
        fallback_reason,
        grid_search_details,
        commission,
        shadow_cost: shadow,
    }
}

/// Weight the zone multiplier by the distance a route's segments actually
/// spend in each zone when a polyline is available, instead of just
/// `max(pickupZone, dropoffZone)` (spec §4.4/§4.8).
fn segmented_multiplier_rule(
    segmentation: &RouteSegmentation,
    price: Decimal,
) -> (Decimal, Option<AppliedRule>) {
    let multiplier = segmentation.weighted_multiplier;
    if multiplier == 1.0 {
        return (price, None);
    }
    let price_after = crate::money::round2(price * crate::money::decimal_from_f64(multiplier));
    (
        price_after,
        Some(AppliedRule::RouteSegmentMultiplier {
            weighted_multiplier: crate::money::decimal_from_f64(multiplier),
            segment_count: segmentation.segments.len(),
            price_before: price,
            price_after,
        }),
    )
}

#[allow(clippy::too_many_arguments)]
fn dynamic_price(
    request: &PricingRequest,
    ctx: &PricingEngineContext,
    pickup_zone: Option<&Zone>,
    dropoff_zone: Option<&Zone>,
    distance_km: f64,
    duration_minutes: f64,
    fallback_reason: Option<FallbackReason>,
    grid_search_details: Option<GridSearchDetails>,
    commission_percent: Option<Decimal>,
    mut applied_rules: Vec<AppliedRule>,
) -> PricingResult {
    let distance = crate::money::decimal_from_f64(distance_km);
    let duration_hours = crate::money::decimal_from_f64(duration_minutes / 60.0);

    // Category rates take over from org rates; when present the category's
    // own multiplier must not be re-applied (double-counting rule, §4.9).
    let (rate_per_km, rate_per_hour, category_multiplier) = if ctx.vehicle_category.has_specific_rates() {
        (
            ctx.vehicle_category.default_rate_per_km.unwrap(),
            ctx.vehicle_category.default_rate_per_hour.unwrap(),
            None,
        )
    } else {
        (
            ctx.settings.base_rate_per_km,
            ctx.settings.base_rate_per_hour,
            Some(ctx.vehicle_category.price_multiplier),
        )
    };

    let base_price = std::cmp::max(
        crate::money::round2(distance * rate_per_km),
        crate::money::round2(duration_hours * rate_per_hour),
    );
    let mut price =
        crate::money::round2(base_price * (Decimal::ONE + ctx.settings.target_margin_percent / Decimal::from(100)));

    if let Some(multiplier) = category_multiplier {
        if multiplier != 1.0 {
            price = crate::money::round2(price * crate::money::decimal_from_f64(multiplier));
        }
    }

    let (price_after_zone, zone_rule) = match &request.route_polyline {
        Some(polyline) => {
            let segmentation = segment_route(polyline, ctx.zones, duration_minutes, ctx.zone_conflict_strategy);
            segmented_multiplier_rule(&segmentation, price)
        }
        None => zone_multiplier_rule(pickup_zone, dropoff_zone, price),
    };
    price = price_after_zone;
    if let Some(rule) = zone_rule {
        applied_rules.push(rule);
    }

    if let Some(pickup_at) = request.pickup_at {
        let (price_after_rates, mut rate_rules) = apply_advanced_rates(price, ctx.advanced_rates, pickup_at);
        price = price_after_rates;
        applied_rules.append(&mut rate_rules);

        let (price_after_seasonal, mut seasonal_rules) =
            apply_seasonal_multipliers(price, ctx.seasonal_multipliers, pickup_at);
        price = price_after_seasonal;
        applied_rules.append(&mut seasonal_rules);
    }

    finalize_with_cost(
        PricingMode::Dynamic,
        price,
        applied_rules,
        None,
        false,
        fallback_reason,
        grid_search_details,
        commission_percent,
        distance_km,
        duration_minutes,
        ctx.settings,
    )
}

/// Compute a full `PricingResult` for `request` under `ctx` (spec §4.8).
pub fn compute_price(request: &PricingRequest, ctx: &PricingEngineContext) -> CoreResult<PricingResult> {
    if ctx.contact.id != request.contact_id {
        return Err(CoreError::UnknownContact(request.contact_id.clone()));
    }

    let (distance_km, duration_minutes) = resolve_trip_inputs(request);

    let pickup_zone = ctx.zones.classify_point(request.pickup, ctx.zone_conflict_strategy);
    let dropoff_zone = ctx.zones.classify_point(request.dropoff, ctx.zone_conflict_strategy);
    let applied_rules = vec![AppliedRule::ZoneMapping {
        pickup_zone_id: pickup_zone.map(|z| z.id.clone()),
        dropoff_zone_id: dropoff_zone.map(|z| z.id.clone()),
    }];

    if !ctx.contact.is_partner {
        return Ok(dynamic_price(
            request,
            ctx,
            pickup_zone,
            dropoff_zone,
            distance_km,
            duration_minutes,
            Some(FallbackReason::PrivateClient),
            None,
            None,
            applied_rules,
        ));
    }

    let Some(contract) = &ctx.contact.partner_contract else {
        return Ok(dynamic_price(
            request,
            ctx,
            pickup_zone,
            dropoff_zone,
            distance_km,
            duration_minutes,
            Some(FallbackReason::NoContract),
            None,
            None,
            applied_rules,
        ));
    };

    let pickup_zone_ids: Vec<String> = ctx
        .zones
        .classify_point_all(request.pickup, ctx.zone_conflict_strategy)
        .into_iter()
        .map(|z| z.id.clone())
        .collect();
    let dropoff_zone_ids: Vec<String> = ctx
        .zones
        .classify_point_all(request.dropoff, ctx.zone_conflict_strategy)
        .into_iter()
        .map(|z| z.id.clone())
        .collect();

    match match_grid(
        request.trip_type,
        contract,
        &request.vehicle_category_id,
        request.pickup,
        request.dropoff,
        &pickup_zone_ids,
        &dropoff_zone_ids,
        distance_km,
        duration_minutes,
    ) {
        Ok(grid_match) => {
            let mut rules = applied_rules;
            let is_contract_price = matches!(grid_match.applied_rule, AppliedRule::PartnerOverridePrice { .. });
            rules.push(grid_match.applied_rule);
            Ok(finalize_with_cost(
                PricingMode::FixedGrid,
                grid_match.effective_price,
                rules,
                Some(grid_match.matched_id),
                is_contract_price,
                None,
                Some(grid_match.search_details),
                contract.commission_percent,
                distance_km,
                duration_minutes,
                ctx.settings,
            ))
        }
        Err(GridMiss { reason, details }) => Ok(dynamic_price(
            request,
            ctx,
            pickup_zone,
            dropoff_zone,
            distance_km,
            duration_minutes,
            Some(reason.into()),
            Some(details),
            contract.commission_percent,
            applied_rules,
        )),
    }
}
