//! Shared domain model: contacts, partner contracts, catalog entries, and
//! vehicle categories (spec §3).
//!
//! These are plain data records, not behaviour, kept separate from the
//! matching/pricing algorithms that consume them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TripType {
    Transfer,
    Excursion,
    Dispo,
    Stay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    AToB,
    BToA,
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegulatoryClass {
    Light,
    Heavy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleCategory {
    pub id: String,
    pub code: String,
    pub price_multiplier: f64,
    pub default_rate_per_km: Option<Decimal>,
    pub default_rate_per_hour: Option<Decimal>,
    pub regulatory_class: RegulatoryClass,
    pub fuel_type: String,
}

impl VehicleCategory {
    /// When both category rates are set, they take over from organization
    /// rates and the category multiplier must not be re-applied (spec §4.9).
    pub fn has_specific_rates(&self) -> bool {
        self.default_rate_per_km.is_some() && self.default_rate_per_hour.is_some()
    }
}

/// An endpoint of a `ZoneRoute`: either a fixed address (with a small match
/// radius) or a set of zone ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum RouteEndpoint {
    Address {
        point: GeoPoint,
        proximity_km: f64,
    },
    Zones {
        zone_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRoute {
    pub id: String,
    pub is_active: bool,
    pub origin: Option<RouteEndpoint>,
    pub destination: Option<RouteEndpoint>,
    /// Legacy single-zone fallback, used when `origin`/`destination` are absent.
    pub from_zone_id: Option<String>,
    pub to_zone_id: Option<String>,
    pub vehicle_category_id: String,
    pub fixed_price: Decimal,
    pub override_price: Option<Decimal>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcursionPackage {
    pub id: String,
    pub is_active: bool,
    pub origin_zone_id: Option<String>,
    pub destination_zone_id: Option<String>,
    pub vehicle_category_id: String,
    pub price: Decimal,
    pub override_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispoPackage {
    pub id: String,
    pub is_active: bool,
    pub vehicle_category_id: String,
    pub base_price: Decimal,
    pub included_km_per_hour: f64,
    pub overage_rate_per_km: Decimal,
    pub override_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerContract {
    pub zone_routes: Vec<ZoneRoute>,
    pub excursion_packages: Vec<ExcursionPackage>,
    pub dispo_packages: Vec<DispoPackage>,
    /// Net payment terms in days, used by the invoice factory's due-date calc.
    pub payment_terms_days: Option<i64>,
    pub commission_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub is_partner: bool,
    pub partner_contract: Option<PartnerContract>,
}

/// Internal vehicle/driver assignment held against a trip's cost breakdown,
/// released when a mission is subcontracted (spec §4.13).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleAssignment {
    pub vehicle_id: String,
    pub driver_id: String,
}
