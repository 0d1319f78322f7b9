//! HTTP-backed `RoutingProvider`/`FuelPriceProvider` implementations: thin
//! `reqwest::blocking` wrappers that degrade to `None` on any transport or
//! parse failure rather than erroring the whole pricing call.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::geo::GeoPoint;
use crate::repository::{FuelPriceProvider, RouteResult, RoutingProvider};

/// Queries an OSRM-compatible `/route/v1/driving/{lng},{lat};{lng},{lat}`
/// endpoint for distance, duration, and geometry.
pub struct OsrmRoutingProvider {
    pub base_url: String,
    pub client: reqwest::blocking::Client,
}

impl OsrmRoutingProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Option<String>,
}

impl RoutingProvider for OsrmRoutingProvider {
    fn route(&self, from: GeoPoint, to: GeoPoint, _at: Option<NaiveDateTime>) -> Option<RouteResult> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full",
            self.base_url.trim_end_matches('/'),
            from.lng,
            from.lat,
            to.lng,
            to.lat
        );
        let response = self.client.get(&url).send().ok()?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "osrm route request failed");
            return None;
        }
        let parsed: OsrmResponse = response.json().ok()?;
        let route = parsed.routes.into_iter().next()?;
        Some(RouteResult {
            distance_km: route.distance / 1000.0,
            duration_minutes: route.duration / 60.0,
            polyline: route.geometry,
            toll_amount: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FuelPriceResponse {
    price_per_liter: f64,
}

/// Queries a `GET /prices/{region}` fuel price cache service.
pub struct HttpFuelPriceProvider {
    pub base_url: String,
    pub client: reqwest::blocking::Client,
}

impl HttpFuelPriceProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl FuelPriceProvider for HttpFuelPriceProvider {
    fn price_per_liter(&self, region: &str) -> Option<Decimal> {
        let url = format!("{}/prices/{region}", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().ok()?;
        if !response.status().is_success() {
            return None;
        }
        let parsed: FuelPriceResponse = response.json().ok()?;
        Decimal::try_from(parsed.price_per_liter).ok()
    }
}
