//! In-memory, zero-dependency reference implementations of the repository
//! ports, for tests and the CLI demo.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::cost::OrganizationPricingSettings;
use crate::geo::{haversine_km, GeoPoint};
use crate::invoice::Invoice;
use crate::model::{Contact, VehicleCategory};
use crate::quote::{Quote, QuoteStatusAuditLog};
use crate::repository::{
    AuditRepository, ContactRepository, FuelPriceProvider, InvoiceRepository, OrderRepository, QuoteRepository,
    RouteResult, RoutingProvider, SettingsRepository, SubcontractorRepository, VehicleCategoryRepository,
    ZoneRepository,
};
use crate::subcontract::Subcontractor;
use crate::zone::Zone;

/// A straight-line router: wraps `haversine_km` as a `RoutingProvider`, with
/// duration estimated at a fixed average speed. Useful as a default in
/// demos and tests where no real routing backend is wired up.
pub struct HaversineRoutingProvider {
    pub average_speed_kmh: f64,
}

impl Default for HaversineRoutingProvider {
    fn default() -> Self {
        Self { average_speed_kmh: 50.0 }
    }
}

impl RoutingProvider for HaversineRoutingProvider {
    fn route(&self, from: GeoPoint, to: GeoPoint, _at: Option<NaiveDateTime>) -> Option<RouteResult> {
        let distance_km = haversine_km(from, to);
        let duration_minutes = distance_km / self.average_speed_kmh * 60.0;
        Some(RouteResult {
            distance_km,
            duration_minutes,
            polyline: None,
            toll_amount: None,
        })
    }
}

#[derive(Default)]
pub struct InMemoryFuelPriceProvider {
    prices: HashMap<String, Decimal>,
}

impl InMemoryFuelPriceProvider {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }
}

impl FuelPriceProvider for InMemoryFuelPriceProvider {
    fn price_per_liter(&self, region: &str) -> Option<Decimal> {
        self.prices.get(region).copied()
    }
}

#[derive(Default)]
pub struct InMemoryZoneRepository {
    zones: Mutex<Vec<Zone>>,
}

impl InMemoryZoneRepository {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones: Mutex::new(zones) }
    }
}

impl ZoneRepository for InMemoryZoneRepository {
    fn list_active(&self) -> Vec<Zone> {
        self.zones.lock().unwrap().iter().filter(|z| z.is_active).cloned().collect()
    }

    fn find_by_id(&self, id: &str) -> Option<Zone> {
        self.zones.lock().unwrap().iter().find(|z| z.id == id).cloned()
    }
}

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: Mutex<HashMap<String, Contact>>,
}

impl InMemoryContactRepository {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: Mutex::new(contacts.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }
}

impl ContactRepository for InMemoryContactRepository {
    fn find_by_id(&self, id: &str) -> Option<Contact> {
        self.contacts.lock().unwrap().get(id).cloned()
    }
}

#[derive(Default)]
pub struct InMemoryVehicleCategoryRepository {
    categories: Mutex<HashMap<String, VehicleCategory>>,
}

impl InMemoryVehicleCategoryRepository {
    pub fn new(categories: Vec<VehicleCategory>) -> Self {
        Self {
            categories: Mutex::new(categories.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }
}

impl VehicleCategoryRepository for InMemoryVehicleCategoryRepository {
    fn find_by_id(&self, id: &str) -> Option<VehicleCategory> {
        self.categories.lock().unwrap().get(id).cloned()
    }
}

pub struct StaticSettingsRepository {
    pub settings: OrganizationPricingSettings,
}

impl SettingsRepository for StaticSettingsRepository {
    fn organization_settings(&self) -> OrganizationPricingSettings {
        self.settings.clone()
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: Mutex<HashMap<String, Quote>>,
}

impl QuoteRepository for InMemoryQuoteRepository {
    fn find_by_id(&self, id: &str) -> Option<Quote> {
        self.quotes.lock().unwrap().get(id).cloned()
    }

    fn save(&self, quote: &Quote) {
        self.quotes.lock().unwrap().insert(quote.id.clone(), quote.clone());
    }

    fn reference_exists(&self, reference: &str) -> bool {
        self.quotes.lock().unwrap().values().any(|q| q.id == reference)
    }

    fn list_eligible_for_auto_expiry(&self, now: DateTime<Utc>) -> Vec<Quote> {
        self.quotes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.should_auto_expire(now))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    references: Mutex<Vec<String>>,
    links: Mutex<HashMap<String, String>>,
}

impl OrderRepository for InMemoryOrderRepository {
    fn reference_exists(&self, reference: &str) -> bool {
        self.references.lock().unwrap().iter().any(|r| r == reference)
    }

    fn create(&self, reference: &str, quote_id: &str) -> String {
        self.references.lock().unwrap().push(reference.to_string());
        self.links.lock().unwrap().insert(quote_id.to_string(), reference.to_string());
        reference.to_string()
    }

    fn relink_orphan_missions(&self, _quote_id: &str, _order_id: &str) {
        // No mission store in this reference implementation.
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    sequences: Mutex<HashMap<(String, i32), u32>>,
    invoices: Mutex<Vec<Invoice>>,
}

impl InvoiceRepository for InMemoryInvoiceRepository {
    fn next_sequence(&self, org_id: &str, year: i32) -> u32 {
        let mut sequences = self.sequences.lock().unwrap();
        let entry = sequences.entry((org_id.to_string(), year)).or_insert(0);
        *entry += 1;
        *entry
    }

    fn save(&self, invoice: &Invoice) {
        self.invoices.lock().unwrap().push(invoice.clone());
    }
}

#[derive(Default)]
pub struct InMemoryAuditRepository {
    entries: Mutex<Vec<(String, QuoteStatusAuditLog)>>,
}

impl AuditRepository for InMemoryAuditRepository {
    fn append_quote_status(&self, quote_id: &str, entry: &QuoteStatusAuditLog) {
        self.entries.lock().unwrap().push((quote_id.to_string(), entry.clone()));
    }
}

#[derive(Default)]
pub struct InMemorySubcontractorRepository {
    subcontractors: Mutex<Vec<Subcontractor>>,
}

impl InMemorySubcontractorRepository {
    pub fn new(subcontractors: Vec<Subcontractor>) -> Self {
        Self { subcontractors: Mutex::new(subcontractors) }
    }
}

impl SubcontractorRepository for InMemorySubcontractorRepository {
    fn list_active(&self) -> Vec<Subcontractor> {
        self.subcontractors.lock().unwrap().iter().filter(|s| s.is_active).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_provider_estimates_duration_from_speed() {
        let provider = HaversineRoutingProvider { average_speed_kmh: 60.0 };
        let route = provider
            .route(GeoPoint::new(48.8566, 2.3522), GeoPoint::new(48.9, 2.4), None)
            .unwrap();
        assert!(route.duration_minutes > 0.0);
        assert!(route.polyline.is_none());
    }

    #[test]
    fn order_repository_round_trips_reference() {
        let repo = InMemoryOrderRepository::default();
        assert!(!repo.reference_exists("ORD-2024-001"));
        repo.create("ORD-2024-001", "q1");
        assert!(repo.reference_exists("ORD-2024-001"));
    }

    #[test]
    fn invoice_sequence_increments_per_org_year() {
        let repo = InMemoryInvoiceRepository::default();
        assert_eq!(repo.next_sequence("org1", 2024), 1);
        assert_eq!(repo.next_sequence("org1", 2024), 2);
        assert_eq!(repo.next_sequence("org2", 2024), 1);
    }
}
