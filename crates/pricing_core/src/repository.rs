//! Repository and provider ports (spec §6.C).
//!
//! Each port is a small `Send + Sync` trait returning `Option`/`Result`,
//! implemented once against an external backend (behind `http-providers`)
//! and once in `testkit` as an always-available in-memory reference.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::cost::OrganizationPricingSettings;
use crate::geo::GeoPoint;
use crate::invoice::Invoice;
use crate::model::{Contact, VehicleCategory};
use crate::quote::{Quote, QuoteStatusAuditLog};
use crate::subcontract::Subcontractor;
use crate::zone::Zone;

/// A routed path between two points, as opposed to a Haversine estimate.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub polyline: Option<String>,
    pub toll_amount: Option<Decimal>,
}

pub trait RoutingProvider: Send + Sync {
    fn route(&self, from: GeoPoint, to: GeoPoint, at: Option<NaiveDateTime>) -> Option<RouteResult>;
}

pub trait FuelPriceProvider: Send + Sync {
    fn price_per_liter(&self, region: &str) -> Option<Decimal>;
}

pub trait ZoneRepository: Send + Sync {
    fn list_active(&self) -> Vec<Zone>;
    fn find_by_id(&self, id: &str) -> Option<Zone>;
}

pub trait ContactRepository: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<Contact>;
}

pub trait VehicleCategoryRepository: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<VehicleCategory>;
}

pub trait SettingsRepository: Send + Sync {
    fn organization_settings(&self) -> OrganizationPricingSettings;
}

pub trait QuoteRepository: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<Quote>;
    fn save(&self, quote: &Quote);
    fn reference_exists(&self, reference: &str) -> bool;
    fn list_eligible_for_auto_expiry(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<Quote>;
}

pub trait OrderRepository: Send + Sync {
    fn reference_exists(&self, reference: &str) -> bool;
    fn create(&self, reference: &str, quote_id: &str) -> String;
    fn relink_orphan_missions(&self, quote_id: &str, order_id: &str);
}

pub trait InvoiceRepository: Send + Sync {
    fn next_sequence(&self, org_id: &str, year: i32) -> u32;
    fn save(&self, invoice: &Invoice);
}

pub trait AuditRepository: Send + Sync {
    fn append_quote_status(&self, quote_id: &str, entry: &QuoteStatusAuditLog);
}

pub trait SubcontractorRepository: Send + Sync {
    fn list_active(&self) -> Vec<Subcontractor>;
}
