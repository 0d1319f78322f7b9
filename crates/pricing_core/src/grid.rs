//! Grid matcher ("Engagement Rule"): match a partner contract's catalog
//! entries against a trip request (spec §4.7).
//!
//! Each match function is a pure function over a candidate list that either
//! yields a single match or an explained miss, rather than throwing on
//! no-match.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::{point_in_radius, GeoPoint};
use crate::model::{Direction, DispoPackage, ExcursionPackage, PartnerContract, RouteEndpoint, TripType, ZoneRoute};
use crate::rules::AppliedRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    Inactive,
    CategoryMismatch,
    ZoneMismatch,
    DirectionMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckedEntry {
    pub id: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMatch {
    pub matched_id: String,
    pub effective_price: Decimal,
    pub applied_rule: AppliedRule,
    /// Entries rejected before the winning one, same shape as `GridMiss::details`.
    pub search_details: GridSearchDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GridMissReason {
    NoZoneMatch,
    NoRouteMatch,
    NoExcursionMatch,
    NoDispoMatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridSearchDetails {
    pub routes_checked: Vec<CheckedEntry>,
    pub excursions_checked: Vec<CheckedEntry>,
    pub dispos_checked: Vec<CheckedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMiss {
    pub reason: GridMissReason,
    pub details: GridSearchDetails,
}

fn endpoint_matches(endpoint: &Option<RouteEndpoint>, point: GeoPoint, zone_ids: &[String]) -> bool {
    match endpoint {
        None => true,
        Some(RouteEndpoint::Address { point: target, proximity_km }) => {
            point_in_radius(point, *target, *proximity_km)
        }
        Some(RouteEndpoint::Zones { zone_ids: required }) => required.iter().any(|z| zone_ids.contains(z)),
    }
}

fn legacy_matches(route: &ZoneRoute, pickup_zones: &[String], dropoff_zones: &[String], reverse: bool) -> bool {
    let (from, to) = if reverse {
        (&route.to_zone_id, &route.from_zone_id)
    } else {
        (&route.from_zone_id, &route.to_zone_id)
    };
    let from_ok = from.as_ref().map(|z| pickup_zones.contains(z)).unwrap_or(true);
    let to_ok = to.as_ref().map(|z| dropoff_zones.contains(z)).unwrap_or(true);
    from_ok && to_ok
}

fn uses_endpoints(route: &ZoneRoute) -> bool {
    route.origin.is_some() || route.destination.is_some()
}

/// Precedence rank, lower sorts first: address+address, address+zones,
/// zones+address, multi-zone, legacy fallback (spec §4.7).
fn precedence_rank(route: &ZoneRoute) -> u8 {
    match (&route.origin, &route.destination) {
        (Some(RouteEndpoint::Address { .. }), Some(RouteEndpoint::Address { .. })) => 0,
        (Some(RouteEndpoint::Address { .. }), Some(RouteEndpoint::Zones { .. })) => 1,
        (Some(RouteEndpoint::Zones { .. }), Some(RouteEndpoint::Address { .. })) => 2,
        (Some(RouteEndpoint::Zones { .. }), Some(RouteEndpoint::Zones { .. })) => 3,
        (None, None) => 4,
        _ => 3,
    }
}

fn evaluate_zone_route(
    route: &ZoneRoute,
    vehicle_category_id: &str,
    pickup: GeoPoint,
    dropoff: GeoPoint,
    pickup_zones: &[String],
    dropoff_zones: &[String],
) -> Result<(), RejectionReason> {
    if !route.is_active {
        return Err(RejectionReason::Inactive);
    }
    if route.vehicle_category_id != vehicle_category_id {
        return Err(RejectionReason::CategoryMismatch);
    }

    let (forward, reverse) = if uses_endpoints(route) {
        let forward = endpoint_matches(&route.origin, pickup, pickup_zones)
            && endpoint_matches(&route.destination, dropoff, dropoff_zones);
        let reverse = endpoint_matches(&route.origin, dropoff, dropoff_zones)
            && endpoint_matches(&route.destination, pickup, pickup_zones);
        (forward, reverse)
    } else {
        (
            legacy_matches(route, pickup_zones, dropoff_zones, false),
            legacy_matches(route, pickup_zones, dropoff_zones, true),
        )
    };

    if forward {
        if matches!(route.direction, Direction::AToB | Direction::Bidirectional) {
            return Ok(());
        }
        return Err(RejectionReason::DirectionMismatch);
    }
    if reverse {
        if matches!(route.direction, Direction::BToA | Direction::Bidirectional) {
            return Ok(());
        }
        return Err(RejectionReason::DirectionMismatch);
    }
    Err(RejectionReason::ZoneMismatch)
}

fn effective_price_and_rule(catalog_price: Decimal, override_price: Option<Decimal>) -> (Decimal, AppliedRule) {
    match override_price {
        Some(price) => (price, AppliedRule::PartnerOverridePrice { price }),
        None => (catalog_price, AppliedRule::CatalogPrice { price: catalog_price }),
    }
}

fn match_zone_route(
    contract: &PartnerContract,
    vehicle_category_id: &str,
    pickup: GeoPoint,
    dropoff: GeoPoint,
    pickup_zones: &[String],
    dropoff_zones: &[String],
) -> Result<GridMatch, GridMiss> {
    let mut routes: Vec<&ZoneRoute> = contract.zone_routes.iter().collect();
    routes.sort_by_key(|r| precedence_rank(r));

    let mut checked = Vec::new();
    for route in routes {
        match evaluate_zone_route(route, vehicle_category_id, pickup, dropoff, pickup_zones, dropoff_zones) {
            Ok(()) => {
                let (price, rule) = effective_price_and_rule(route.fixed_price, route.override_price);
                return Ok(GridMatch {
                    matched_id: route.id.clone(),
                    effective_price: price,
                    applied_rule: rule,
                    search_details: GridSearchDetails {
                        routes_checked: checked,
                        ..Default::default()
                    },
                });
            }
            Err(reason) => checked.push(CheckedEntry { id: route.id.clone(), reason }),
        }
    }

    let no_zone_context = pickup_zones.is_empty()
        && dropoff_zones.is_empty()
        && contract.zone_routes.iter().all(uses_endpoints_or_legacy_zone_free);
    let reason = if no_zone_context {
        GridMissReason::NoZoneMatch
    } else {
        GridMissReason::NoRouteMatch
    };
    Err(GridMiss {
        reason,
        details: GridSearchDetails {
            routes_checked: checked,
            ..Default::default()
        },
    })
}

fn uses_endpoints_or_legacy_zone_free(route: &ZoneRoute) -> bool {
    !matches!(route.origin, Some(RouteEndpoint::Address { .. }))
        && !matches!(route.destination, Some(RouteEndpoint::Address { .. }))
}

fn match_excursion(
    contract: &PartnerContract,
    vehicle_category_id: &str,
    pickup_zones: &[String],
    dropoff_zones: &[String],
) -> Result<GridMatch, GridMiss> {
    let mut checked = Vec::new();
    for pkg in &contract.excursion_packages {
        if !pkg.is_active {
            checked.push(CheckedEntry { id: pkg.id.clone(), reason: RejectionReason::Inactive });
            continue;
        }
        if pkg.vehicle_category_id != vehicle_category_id {
            checked.push(CheckedEntry { id: pkg.id.clone(), reason: RejectionReason::CategoryMismatch });
            continue;
        }
        let origin_ok = pkg.origin_zone_id.as_ref().map(|z| pickup_zones.contains(z)).unwrap_or(true);
        let dest_ok = pkg.destination_zone_id.as_ref().map(|z| dropoff_zones.contains(z)).unwrap_or(true);
        if !origin_ok || !dest_ok {
            checked.push(CheckedEntry { id: pkg.id.clone(), reason: RejectionReason::ZoneMismatch });
            continue;
        }
        let (price, rule) = effective_price_and_rule(pkg.price, pkg.override_price);
        return Ok(GridMatch {
            matched_id: pkg.id.clone(),
            effective_price: price,
            applied_rule: rule,
            search_details: GridSearchDetails {
                excursions_checked: checked,
                ..Default::default()
            },
        });
    }
    Err(GridMiss {
        reason: GridMissReason::NoExcursionMatch,
        details: GridSearchDetails { excursions_checked: checked, ..Default::default() },
    })
}

/// `basePrice` plus overage past the included-km allowance for the trip's
/// duration (spec §8 scenarios 4–5). An `overridePrice`, when present,
/// replaces the whole computed price rather than adding to it.
fn dispo_price(pkg: &DispoPackage, distance_km: f64, duration_minutes: f64) -> Decimal {
    let included_km = pkg.included_km_per_hour * (duration_minutes / 60.0);
    let overage_km = (distance_km - included_km).max(0.0);
    let overage_charge = crate::money::round2(
        crate::money::decimal_from_f64(overage_km) * pkg.overage_rate_per_km,
    );
    crate::money::round2(pkg.base_price + overage_charge)
}

fn match_dispo(
    contract: &PartnerContract,
    vehicle_category_id: &str,
    distance_km: f64,
    duration_minutes: f64,
) -> Result<GridMatch, GridMiss> {
    let mut checked = Vec::new();
    for pkg in &contract.dispo_packages {
        if !pkg.is_active {
            checked.push(CheckedEntry { id: pkg.id.clone(), reason: RejectionReason::Inactive });
            continue;
        }
        if pkg.vehicle_category_id != vehicle_category_id {
            checked.push(CheckedEntry { id: pkg.id.clone(), reason: RejectionReason::CategoryMismatch });
            continue;
        }
        let catalog_price = dispo_price(pkg, distance_km, duration_minutes);
        let (price, rule) = effective_price_and_rule(catalog_price, pkg.override_price);
        return Ok(GridMatch {
            matched_id: pkg.id.clone(),
            effective_price: price,
            applied_rule: rule,
            search_details: GridSearchDetails {
                dispos_checked: checked,
                ..Default::default()
            },
        });
    }
    Err(GridMiss {
        reason: GridMissReason::NoDispoMatch,
        details: GridSearchDetails { dispos_checked: checked, ..Default::default() },
    })
}

/// Dispatch to the matcher for `trip_type`. `DispoPackage`/`ExcursionPackage`
/// are distinguished by reference only for readability; the match functions
/// above take the contract directly.
#[allow(clippy::too_many_arguments)]
pub fn match_grid(
    trip_type: TripType,
    contract: &PartnerContract,
    vehicle_category_id: &str,
    pickup: GeoPoint,
    dropoff: GeoPoint,
    pickup_zones: &[String],
    dropoff_zones: &[String],
    distance_km: f64,
    duration_minutes: f64,
) -> Result<GridMatch, GridMiss> {
    match trip_type {
        TripType::Transfer => {
            match_zone_route(contract, vehicle_category_id, pickup, dropoff, pickup_zones, dropoff_zones)
        }
        TripType::Excursion => match_excursion(contract, vehicle_category_id, pickup_zones, dropoff_zones),
        TripType::Dispo => match_dispo(contract, vehicle_category_id, distance_km, duration_minutes),
        TripType::Stay => match_dispo(contract, vehicle_category_id, distance_km, duration_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn route(id: &str, category: &str, direction: Direction) -> ZoneRoute {
        ZoneRoute {
            id: id.into(),
            is_active: true,
            origin: Some(RouteEndpoint::Zones { zone_ids: vec!["CDG".into()] }),
            destination: Some(RouteEndpoint::Zones { zone_ids: vec!["PARIS".into()] }),
            from_zone_id: None,
            to_zone_id: None,
            vehicle_category_id: category.into(),
            fixed_price: dec!(80),
            override_price: None,
            direction,
        }
    }

    #[test]
    fn matches_forward_multi_zone_route() {
        let mut contract = PartnerContract::default();
        contract.zone_routes.push(route("r1", "sedan", Direction::AToB));
        let pickup = GeoPoint::new(49.0097, 2.5479);
        let dropoff = GeoPoint::new(48.8566, 2.3522);
        let result = match_zone_route(
            &contract,
            "sedan",
            pickup,
            dropoff,
            &["CDG".to_string()],
            &["PARIS".to_string()],
        );
        assert!(result.is_ok());
        assert_eq!(result.unwrap().effective_price, dec!(80));
    }

    #[test]
    fn direction_mismatch_rejects_wrong_way() {
        let mut contract = PartnerContract::default();
        contract.zone_routes.push(route("r1", "sedan", Direction::AToB));
        let pickup = GeoPoint::new(48.8566, 2.3522);
        let dropoff = GeoPoint::new(49.0097, 2.5479);
        let err = match_zone_route(
            &contract,
            "sedan",
            pickup,
            dropoff,
            &["PARIS".to_string()],
            &["CDG".to_string()],
        )
        .unwrap_err();
        assert_eq!(err.details.routes_checked[0].reason, RejectionReason::DirectionMismatch);
    }

    #[test]
    fn override_price_wins_over_catalog() {
        let mut r = route("r1", "sedan", Direction::AToB);
        r.override_price = Some(dec!(65));
        let mut contract = PartnerContract::default();
        contract.zone_routes.push(r);
        let result = match_zone_route(
            &contract,
            "sedan",
            GeoPoint::new(49.0097, 2.5479),
            GeoPoint::new(48.8566, 2.3522),
            &["CDG".to_string()],
            &["PARIS".to_string()],
        )
        .unwrap();
        assert_eq!(result.effective_price, dec!(65));
        matches!(result.applied_rule, AppliedRule::PartnerOverridePrice { .. });
    }

    #[test]
    fn dispo_matches_by_category_only() {
        let mut contract = PartnerContract::default();
        contract.dispo_packages.push(DispoPackage {
            id: "d1".into(),
            is_active: true,
            vehicle_category_id: "van".into(),
            base_price: dec!(200),
            included_km_per_hour: 30.0,
            overage_rate_per_km: dec!(1.2),
            override_price: None,
        });
        let result = match_dispo(&contract, "van", 30.0, 60.0).unwrap();
        assert_eq!(result.effective_price, dec!(200));
    }

    #[test]
    fn dispo_charges_overage_past_included_km() {
        let mut contract = PartnerContract::default();
        contract.dispo_packages.push(DispoPackage {
            id: "d1".into(),
            is_active: true,
            vehicle_category_id: "sedan".into(),
            base_price: dec!(180),
            included_km_per_hour: 50.0,
            overage_rate_per_km: dec!(0.5),
            override_price: None,
        });
        // 4h booking, 200km included (50km/h * 4h).
        let within_allowance = match_dispo(&contract, "sedan", 150.0, 240.0).unwrap();
        assert_eq!(within_allowance.effective_price, dec!(180));

        let over_allowance = match_dispo(&contract, "sedan", 250.0, 240.0).unwrap();
        assert_eq!(over_allowance.effective_price, dec!(205));
    }
}
