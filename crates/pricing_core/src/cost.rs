//! Cost engine: per-component internal cost breakdown, and the three-segment
//! shadow-cost decomposition (spec §4.5).
//!
//! Generalizes a flat `base_fare + distance * per_km_rate` formula into a
//! multi-component cost model, carrying its own overridable defaults in
//! [`OrganizationPricingSettings`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::VehicleAssignment;
use crate::money::{decimal_from_f64, round2};

pub const DEFAULT_FUEL_CONSUMPTION_L_PER_100KM: f64 = 8.0;
pub const DEFAULT_FUEL_PRICE_PER_LITER: f64 = 1.80;
pub const DEFAULT_TOLL_COST_PER_KM: f64 = 0.15;
pub const DEFAULT_WEAR_COST_PER_KM: f64 = 0.10;
pub const DEFAULT_DRIVER_HOURLY_COST: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TollSource {
    GoogleApi,
    Estimate,
}

/// Org-level cost and pricing parameters (spec §3 `OrganizationPricingSettings`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPricingSettings {
    pub base_rate_per_km: Decimal,
    pub base_rate_per_hour: Decimal,
    pub target_margin_percent: Decimal,
    pub fuel_consumption_l_per_100km: Option<f64>,
    pub fuel_price_per_liter: Option<Decimal>,
    pub toll_cost_per_km: Option<Decimal>,
    pub wear_cost_per_km: Option<Decimal>,
    pub driver_hourly_cost: Option<Decimal>,
    pub profitability_thresholds: ProfitabilityThresholds,
}

impl Default for OrganizationPricingSettings {
    fn default() -> Self {
        Self {
            base_rate_per_km: Decimal::new(18, 1),  // 1.8
            base_rate_per_hour: Decimal::new(45, 0), // 45
            target_margin_percent: Decimal::new(20, 0),
            fuel_consumption_l_per_100km: None,
            fuel_price_per_liter: None,
            toll_cost_per_km: None,
            wear_cost_per_km: None,
            driver_hourly_cost: None,
            profitability_thresholds: ProfitabilityThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfitabilityThresholds {
    pub green_min_percent: Decimal,
    pub orange_min_percent: Decimal,
}

impl Default for ProfitabilityThresholds {
    fn default() -> Self {
        Self {
            green_min_percent: Decimal::new(20, 0),
            orange_min_percent: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitabilityIndicator {
    Green,
    Orange,
    Red,
}

/// Classify `margin_percent` against `thresholds`. An absent/undefined
/// margin (modeled upstream as `price <= 0`, see `pricing::margin_percent`)
/// classifies as `Red` — the fail-safe choice recorded as an Open Question
/// resolution in DESIGN.md.
pub fn classify_profitability(
    margin_percent: Decimal,
    thresholds: &ProfitabilityThresholds,
) -> ProfitabilityIndicator {
    if margin_percent >= thresholds.green_min_percent {
        ProfitabilityIndicator::Green
    } else if margin_percent >= thresholds.orange_min_percent {
        ProfitabilityIndicator::Orange
    } else {
        ProfitabilityIndicator::Red
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub fuel: Decimal,
    pub tolls: Decimal,
    pub toll_source: TollSource,
    pub toll_is_from_cache: bool,
    pub wear: Decimal,
    pub driver: Decimal,
    pub parking: Decimal,
    pub parking_description: Option<String>,
    pub total: Decimal,
}

/// A real toll amount supplied by a routing provider, when available.
#[derive(Debug, Clone, Copy)]
pub struct TollOverride {
    pub amount: Decimal,
    pub is_from_cache: bool,
}

/// Optional parking cost passthrough.
#[derive(Debug, Clone)]
pub struct ParkingCost {
    pub amount: Decimal,
    pub description: String,
}

/// Compute the per-component cost breakdown for a distance/duration pair.
/// All monetary outputs rounded to 2dp; the total is rounded after summing.
pub fn compute_cost(
    distance_km: f64,
    duration_minutes: f64,
    settings: &OrganizationPricingSettings,
    toll_override: Option<TollOverride>,
    parking: Option<ParkingCost>,
) -> CostBreakdown {
    let distance = decimal_from_f64(distance_km);
    let duration_hours = decimal_from_f64(duration_minutes / 60.0);

    let fuel_consumption = decimal_from_f64(
        settings
            .fuel_consumption_l_per_100km
            .unwrap_or(DEFAULT_FUEL_CONSUMPTION_L_PER_100KM),
    );
    let fuel_price = settings
        .fuel_price_per_liter
        .unwrap_or_else(|| decimal_from_f64(DEFAULT_FUEL_PRICE_PER_LITER));
    let fuel = round2(distance * (fuel_consumption / Decimal::from(100)) * fuel_price);

    let (tolls, toll_source, toll_is_from_cache) = match toll_override {
        Some(o) => (round2(o.amount), TollSource::GoogleApi, o.is_from_cache),
        None => {
            let toll_rate = settings
                .toll_cost_per_km
                .unwrap_or_else(|| decimal_from_f64(DEFAULT_TOLL_COST_PER_KM));
            (round2(distance * toll_rate), TollSource::Estimate, false)
        }
    };

    let wear_rate = settings
        .wear_cost_per_km
        .unwrap_or_else(|| decimal_from_f64(DEFAULT_WEAR_COST_PER_KM));
    let wear = round2(distance * wear_rate);

    let driver_rate = settings
        .driver_hourly_cost
        .unwrap_or_else(|| decimal_from_f64(DEFAULT_DRIVER_HOURLY_COST));
    let driver = round2(duration_hours * driver_rate);

    let (parking_amount, parking_description) = match parking {
        Some(p) => (round2(p.amount), Some(p.description)),
        None => (Decimal::ZERO, None),
    };

    let total = round2(fuel + tolls + wear + driver + parking_amount);

    CostBreakdown {
        fuel,
        tolls,
        toll_source,
        toll_is_from_cache,
        wear,
        driver,
        parking: parking_amount,
        parking_description,
        total,
    }
}

/// One of the three shadow-cost legs: Base→Pickup, Pickup→Dropoff, Dropoff→Base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripLeg {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub cost: CostBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowCost {
    pub approach: Option<TripLeg>,
    pub service: TripLeg,
    pub return_leg: Option<TripLeg>,
    pub total_internal_cost: Decimal,
    /// Per-component sum across every present leg; `tollSource`/
    /// `tollIsFromCache`/`parkingDescription` are taken from the first leg
    /// that has a nonzero/present value, for display only (spec §4.5).
    pub combined: CostBreakdown,
    /// Internal vehicle/driver assignment for this trip, if one exists.
    /// Cleared by `subcontract::apply_subcontract_action` (spec §4.13).
    pub assigned_vehicle: Option<VehicleAssignment>,
}

/// Sum amounts across `breakdowns`; rate-ish/descriptive fields are taken
/// from the first leg where they're meaningful (nonzero tolls, present
/// parking description) rather than summed.
fn combine_breakdowns(breakdowns: &[&CostBreakdown]) -> CostBreakdown {
    let mut fuel = Decimal::ZERO;
    let mut tolls = Decimal::ZERO;
    let mut wear = Decimal::ZERO;
    let mut driver = Decimal::ZERO;
    let mut parking = Decimal::ZERO;
    let mut toll_source = TollSource::Estimate;
    let mut toll_is_from_cache = false;
    let mut parking_description = None;

    for b in breakdowns {
        fuel += b.fuel;
        tolls += b.tolls;
        wear += b.wear;
        driver += b.driver;
        parking += b.parking;
    }
    if let Some(first_with_toll) = breakdowns.iter().find(|b| b.tolls != Decimal::ZERO).or(breakdowns.first()) {
        toll_source = first_with_toll.toll_source;
        toll_is_from_cache = first_with_toll.toll_is_from_cache;
    }
    if let Some(first_with_parking) = breakdowns.iter().find(|b| b.parking_description.is_some()) {
        parking_description = first_with_parking.parking_description.clone();
    }

    let total = round2(fuel + tolls + wear + driver + parking);
    CostBreakdown {
        fuel: round2(fuel),
        tolls: round2(tolls),
        toll_source,
        toll_is_from_cache,
        wear: round2(wear),
        driver: round2(driver),
        parking: round2(parking),
        parking_description,
        total,
    }
}

/// Optional pre-computed approach/return legs, e.g. from vehicle selection.
#[derive(Debug, Clone, Copy)]
pub struct VehicleSelectionLegs {
    pub approach_distance_km: f64,
    pub approach_duration_minutes: f64,
    pub return_distance_km: f64,
    pub return_duration_minutes: f64,
}

/// Decompose a trip into Base→Pickup, Pickup→Dropoff, Dropoff→Base and
/// compute the internal cost per segment. When no vehicle-selection legs are
/// available, only the service segment is produced.
pub fn shadow_cost(
    service_distance_km: f64,
    service_duration_minutes: f64,
    settings: &OrganizationPricingSettings,
    vehicle_selection: Option<VehicleSelectionLegs>,
) -> ShadowCost {
    let service_breakdown = compute_cost(service_distance_km, service_duration_minutes, settings, None, None);
    let service = TripLeg {
        distance_km: service_distance_km,
        duration_minutes: service_duration_minutes,
        cost: service_breakdown,
    };

    let (approach, return_leg) = match vehicle_selection {
        Some(v) => {
            let approach_cost = compute_cost(v.approach_distance_km, v.approach_duration_minutes, settings, None, None);
            let return_cost = compute_cost(v.return_distance_km, v.return_duration_minutes, settings, None, None);
            (
                Some(TripLeg {
                    distance_km: v.approach_distance_km,
                    duration_minutes: v.approach_duration_minutes,
                    cost: approach_cost,
                }),
                Some(TripLeg {
                    distance_km: v.return_distance_km,
                    duration_minutes: v.return_duration_minutes,
                    cost: return_cost,
                }),
            )
        }
        None => (None, None),
    };

    let mut legs = Vec::with_capacity(3);
    if let Some(a) = &approach {
        legs.push(&a.cost);
    }
    legs.push(&service.cost);
    if let Some(r) = &return_leg {
        legs.push(&r.cost);
    }
    let combined = combine_breakdowns(&legs);

    ShadowCost {
        approach,
        service,
        return_leg,
        total_internal_cost: combined.total,
        combined,
        assigned_vehicle: None,
    }
}

/// `marginPercent` is defined as 0 when `price <= 0` (spec §7).
pub fn margin_percent(price: Decimal, margin: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        round2(margin / price * Decimal::from(100))
    }
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_apply_when_settings_unset() {
        let settings = OrganizationPricingSettings::default();
        let breakdown = compute_cost(100.0, 60.0, &settings, None, None);
        assert_eq!(breakdown.fuel, dec!(14.40)); // 100 * 8/100 * 1.8
        assert_eq!(breakdown.tolls, dec!(15.00)); // 100 * 0.15
        assert_eq!(breakdown.wear, dec!(10.00)); // 100 * 0.10
        assert_eq!(breakdown.driver, dec!(25.00)); // 1h * 25
    }

    #[test]
    fn toll_override_replaces_estimate() {
        let settings = OrganizationPricingSettings::default();
        let breakdown = compute_cost(
            100.0,
            60.0,
            &settings,
            Some(TollOverride {
                amount: dec!(22.50),
                is_from_cache: true,
            }),
            None,
        );
        assert_eq!(breakdown.tolls, dec!(22.50));
        assert_eq!(breakdown.toll_source, TollSource::GoogleApi);
        assert!(breakdown.toll_is_from_cache);
    }

    #[test]
    fn margin_percent_is_zero_when_price_non_positive() {
        assert_eq!(margin_percent(Decimal::ZERO, dec!(10)), Decimal::ZERO);
        assert_eq!(margin_percent(dec!(-5), dec!(10)), Decimal::ZERO);
    }

    #[test]
    fn profitability_boundaries() {
        let thresholds = ProfitabilityThresholds::default();
        assert_eq!(
            classify_profitability(dec!(20), &thresholds),
            ProfitabilityIndicator::Green
        );
        assert_eq!(
            classify_profitability(dec!(0), &thresholds),
            ProfitabilityIndicator::Orange
        );
        assert_eq!(
            classify_profitability(dec!(-1), &thresholds),
            ProfitabilityIndicator::Red
        );
    }

    #[test]
    fn shadow_cost_without_vehicle_selection_is_service_only() {
        let settings = OrganizationPricingSettings::default();
        let shadow = shadow_cost(50.0, 30.0, &settings, None);
        assert!(shadow.approach.is_none());
        assert!(shadow.return_leg.is_none());
        assert_eq!(shadow.total_internal_cost, shadow.service.cost.total);
    }

    #[test]
    fn shadow_cost_with_three_segments_sums_totals() {
        let settings = OrganizationPricingSettings::default();
        let legs = VehicleSelectionLegs {
            approach_distance_km: 10.0,
            approach_duration_minutes: 15.0,
            return_distance_km: 12.0,
            return_duration_minutes: 18.0,
        };
        let shadow = shadow_cost(50.0, 30.0, &settings, Some(legs));
        let expected = shadow.approach.as_ref().unwrap().cost.total
            + shadow.service.cost.total
            + shadow.return_leg.as_ref().unwrap().cost.total;
        assert_eq!(shadow.total_internal_cost, round2(expected));
    }

    #[test]
    fn combined_breakdown_sums_amounts_and_matches_total() {
        let settings = OrganizationPricingSettings::default();
        let legs = VehicleSelectionLegs {
            approach_distance_km: 10.0,
            approach_duration_minutes: 15.0,
            return_distance_km: 12.0,
            return_duration_minutes: 18.0,
        };
        let shadow = shadow_cost(50.0, 30.0, &settings, Some(legs));
        let expected_fuel = shadow.approach.as_ref().unwrap().cost.fuel
            + shadow.service.cost.fuel
            + shadow.return_leg.as_ref().unwrap().cost.fuel;
        assert_eq!(shadow.combined.fuel, round2(expected_fuel));
        assert_eq!(shadow.combined.total, shadow.total_internal_cost);
        assert_eq!(shadow.combined.toll_source, TollSource::Estimate);
    }
}
