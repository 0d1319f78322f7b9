//! Subcontractor / empty-leg / match-score subsystem (spec §4.13).
//!
//! Scoring is additive: weighted components summed into one comparable
//! score, rather than a multi-pass filter pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::{point_in_radius, GeoPoint};
use crate::money::{decimal_from_f64, round2};
use crate::quote::{Quote, QuoteStatusAuditLog};

pub const DEFAULT_UNPROFITABILITY_THRESHOLD_PERCENT: f64 = 0.0;
pub const DEFAULT_SUBCONTRACTOR_RATE_PER_KM: f64 = 2.0;
pub const DEFAULT_SUBCONTRACTOR_RATE_PER_HOUR: f64 = 40.0;

pub fn is_unprofitable(margin_percent: Decimal, threshold_percent: Decimal) -> bool {
    margin_percent <= threshold_percent
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AvailabilityStatus {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcontractor {
    pub id: String,
    pub is_active: bool,
    /// Empty means "any category accepted".
    pub vehicle_category_ids: Vec<String>,
    pub operating_zone_ids: Vec<String>,
    pub all_zones: bool,
    pub rate_per_km: Option<Decimal>,
    pub rate_per_hour: Option<Decimal>,
    pub minimum_fare: Option<Decimal>,
    pub availability: AvailabilityStatus,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubcontractRecommendation {
    Subcontract,
    Internal,
    Review,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcontractCandidate {
    pub subcontractor_id: String,
    pub zone_match_score: u8,
    pub suggested_price: Decimal,
    pub recommendation: SubcontractRecommendation,
    pub match_score: u8,
}

fn zone_match(subcontractor: &Subcontractor, pickup_zone_id: Option<&str>, dropoff_zone_id: Option<&str>) -> u8 {
    if subcontractor.all_zones {
        return 100;
    }
    let pickup_ok = pickup_zone_id.is_some_and(|z| subcontractor.operating_zone_ids.iter().any(|o| o == z));
    let dropoff_ok = dropoff_zone_id.is_some_and(|z| subcontractor.operating_zone_ids.iter().any(|o| o == z));
    match (pickup_ok, dropoff_ok) {
        (true, true) => 100,
        (true, false) | (false, true) => 50,
        (false, false) => 0,
    }
}

fn category_match(subcontractor: &Subcontractor, vehicle_category_id: &str) -> bool {
    subcontractor.vehicle_category_ids.is_empty()
        || subcontractor.vehicle_category_ids.iter().any(|c| c == vehicle_category_id)
}

/// Find active subcontractors matching `vehicle_category_id` with nonzero
/// zone overlap, scored and sorted by `zone_match_score`.
pub fn search_candidates<'a>(
    subcontractors: &'a [Subcontractor],
    vehicle_category_id: &str,
    pickup_zone_id: Option<&str>,
    dropoff_zone_id: Option<&str>,
) -> Vec<(&'a Subcontractor, u8)> {
    let mut candidates: Vec<(&Subcontractor, u8)> = subcontractors
        .iter()
        .filter(|s| s.is_active && category_match(s, vehicle_category_id))
        .map(|s| (s, zone_match(s, pickup_zone_id, dropoff_zone_id)))
        .filter(|(_, score)| *score > 0)
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates
}

/// `max(distance·ratePerKm, durationHours·ratePerHour)`, floored at
/// `minimumFare` (spec §4.13).
pub fn suggested_price(subcontractor: &Subcontractor, distance_km: f64, duration_minutes: f64) -> Decimal {
    let rate_per_km = subcontractor
        .rate_per_km
        .unwrap_or_else(|| decimal_from_f64(DEFAULT_SUBCONTRACTOR_RATE_PER_KM));
    let rate_per_hour = subcontractor
        .rate_per_hour
        .unwrap_or_else(|| decimal_from_f64(DEFAULT_SUBCONTRACTOR_RATE_PER_HOUR));

    let distance = decimal_from_f64(distance_km);
    let hours = decimal_from_f64(duration_minutes / 60.0);
    let base = std::cmp::max(round2(distance * rate_per_km), round2(hours * rate_per_hour));

    match subcontractor.minimum_fare {
        Some(floor) if base < floor => floor,
        _ => base,
    }
}

/// SUBCONTRACT if the subcontractor's margin exceeds internal by more than
/// 5% of the selling price, INTERNAL if the reverse, REVIEW otherwise.
pub fn recommend(internal_margin: Decimal, subcontractor_margin: Decimal, selling_price: Decimal) -> SubcontractRecommendation {
    if selling_price == Decimal::ZERO {
        return SubcontractRecommendation::Review;
    }
    let threshold = selling_price * Decimal::new(5, 2);
    let delta = subcontractor_margin - internal_margin;
    if delta > threshold {
        SubcontractRecommendation::Subcontract
    } else if delta < -threshold {
        SubcontractRecommendation::Internal
    } else {
        SubcontractRecommendation::Review
    }
}

/// Composite 100-point match score: zoneMatch(40) + vehicleMatch(30) +
/// availability(20) + performance(10) (spec §4.13).
pub fn composite_match_score(zone_match_score: u8, category_matches: bool, subcontractor: &Subcontractor) -> u8 {
    let zone_component = (zone_match_score as f64 / 100.0) * 40.0;
    let vehicle_component = if category_matches { 30.0 } else { 0.0 };
    let availability_component = match subcontractor.availability {
        AvailabilityStatus::Available => 20.0,
        AvailabilityStatus::Busy => 10.0,
        AvailabilityStatus::Offline => 0.0,
    };
    let performance_component = (subcontractor.avg_rating / 5.0) * 10.0;

    (zone_component + vehicle_component + availability_component + performance_component).round() as u8
}

/// A confirmed decision to subcontract a quote's mission to `subcontractor_id`
/// at `price` (spec §4.13 "Subcontract action").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcontractAction {
    pub subcontractor_id: String,
    pub price: Decimal,
    pub decided_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Apply `action` to `quote`: sets the subcontracted flags, releases the
/// internal vehicle/driver assignment (both on the quote and on its
/// shadow-cost breakdown), and appends an audit entry (spec §4.13). This is
/// not a status transition — `previous_status`/`new_status` are identical —
/// so it composes with `quote::transition` rather than replacing it.
pub fn apply_subcontract_action(mut quote: Quote, action: SubcontractAction) -> Quote {
    quote.is_subcontracted = true;
    quote.subcontractor_id = Some(action.subcontractor_id.clone());
    quote.assigned_vehicle = None;
    quote.pricing_result.shadow_cost.assigned_vehicle = None;

    quote.audit_log.push(QuoteStatusAuditLog {
        previous_status: quote.status,
        new_status: quote.status,
        user_id: None,
        reason: Some(
            action
                .reason
                .unwrap_or_else(|| format!("Subcontracted to {} at {}", action.subcontractor_id, action.price)),
        ),
        timestamp: action.decided_at,
    });

    quote
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmptyLegStatus {
    Available,
    ExpiringSoon,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyLeg {
    pub id: String,
    pub is_active: bool,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub max_match_distance_km: f64,
}

impl EmptyLeg {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.window_end
    }

    pub fn status(&self, now: DateTime<Utc>) -> EmptyLegStatus {
        if self.window_end <= now {
            EmptyLegStatus::Expired
        } else if (self.window_end - now).num_minutes() <= 60 {
            EmptyLegStatus::ExpiringSoon
        } else {
            EmptyLegStatus::Available
        }
    }

    /// `pickupAt ∈ [windowStart, windowEnd]` and both pickup/dropoff within
    /// `maxMatchDistanceKm` of the empty leg's endpoints.
    pub fn matches(&self, pickup_at: DateTime<Utc>, pickup: GeoPoint, dropoff: GeoPoint) -> bool {
        pickup_at >= self.window_start
            && pickup_at <= self.window_end
            && point_in_radius(pickup, self.from, self.max_match_distance_km)
            && point_in_radius(dropoff, self.to, self.max_match_distance_km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use crate::cost::{shadow_cost, OrganizationPricingSettings, ProfitabilityIndicator};
    use crate::model::VehicleAssignment;
    use crate::pricing::{FallbackReason, PricingMode, PricingResult};
    use crate::quote::QuoteStatus;

    fn quote_with_internal_assignment() -> Quote {
        let settings = OrganizationPricingSettings::default();
        let shadow = shadow_cost(10.0, 10.0, &settings, None);
        Quote {
            id: "q1".into(),
            contact_id: "c1".into(),
            status: QuoteStatus::Accepted,
            valid_until: None,
            sent_at: None,
            viewed_at: None,
            accepted_at: None,
            rejected_at: None,
            expired_at: None,
            cancelled_at: None,
            order_id: None,
            pricing_result: PricingResult {
                mode: PricingMode::Dynamic,
                price: dec!(100),
                internal_cost: shadow.total_internal_cost,
                margin: dec!(50),
                margin_percent: dec!(50),
                profitability: ProfitabilityIndicator::Green,
                matched_grid_id: None,
                applied_rules: vec![],
                is_contract_price: false,
                fallback_reason: Some(FallbackReason::PrivateClient),
                grid_search_details: None,
                commission: None,
                shadow_cost: shadow,
            },
            is_subcontracted: false,
            subcontractor_id: None,
            assigned_vehicle: Some(VehicleAssignment {
                vehicle_id: "v1".into(),
                driver_id: "drv1".into(),
            }),
            notes: None,
            audit_log: vec![],
        }
    }

    #[test]
    fn subcontract_action_releases_assignment_and_logs() {
        let quote = quote_with_internal_assignment();
        let action = SubcontractAction {
            subcontractor_id: "sub1".into(),
            price: dec!(120),
            decided_at: Utc::now(),
            reason: None,
        };
        let quote = apply_subcontract_action(quote, action);

        assert!(quote.is_subcontracted);
        assert_eq!(quote.subcontractor_id.as_deref(), Some("sub1"));
        assert!(quote.assigned_vehicle.is_none());
        assert!(quote.pricing_result.shadow_cost.assigned_vehicle.is_none());
        assert_eq!(quote.audit_log.len(), 1);
    }

    fn subcontractor() -> Subcontractor {
        Subcontractor {
            id: "sub1".into(),
            is_active: true,
            vehicle_category_ids: vec!["sedan".into()],
            operating_zone_ids: vec!["cdg".into(), "paris".into()],
            all_zones: false,
            rate_per_km: None,
            rate_per_hour: None,
            minimum_fare: Some(dec!(30)),
            availability: AvailabilityStatus::Available,
            avg_rating: 4.5,
        }
    }

    #[test]
    fn unprofitability_uses_default_zero_threshold() {
        assert!(is_unprofitable(dec!(-1), dec!(0)));
        assert!(is_unprofitable(dec!(0), dec!(0)));
        assert!(!is_unprofitable(dec!(1), dec!(0)));
    }

    #[test]
    fn zone_match_scores_both_either_neither() {
        let s = subcontractor();
        assert_eq!(zone_match(&s, Some("cdg"), Some("paris")), 100);
        assert_eq!(zone_match(&s, Some("cdg"), Some("lyon")), 50);
        assert_eq!(zone_match(&s, Some("lyon"), Some("marseille")), 0);
    }

    #[test]
    fn suggested_price_floors_at_minimum_fare() {
        let s = subcontractor();
        let price = suggested_price(&s, 5.0, 10.0);
        assert_eq!(price, dec!(30));
    }

    #[test]
    fn recommendation_picks_subcontract_when_margin_gain_exceeds_threshold() {
        let rec = recommend(dec!(10), dec!(30), dec!(100));
        assert_eq!(rec, SubcontractRecommendation::Subcontract);
    }

    #[test]
    fn empty_leg_status_transitions() {
        let now = Utc::now();
        let leg = EmptyLeg {
            id: "el1".into(),
            is_active: true,
            window_start: now - Duration::hours(1),
            window_end: now + Duration::minutes(30),
            from: GeoPoint::new(48.8566, 2.3522),
            to: GeoPoint::new(49.0097, 2.5479),
            max_match_distance_km: 5.0,
        };
        assert_eq!(leg.status(now), EmptyLegStatus::ExpiringSoon);
        assert!(leg.is_valid(now));
    }
}
