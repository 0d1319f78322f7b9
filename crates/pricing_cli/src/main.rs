//! Demo CLI: prices a trip against an in-memory fixture tenant.

use clap::Parser;
use rust_decimal::Decimal;

use pricing_core::cost::OrganizationPricingSettings;
use pricing_core::geo::GeoPoint;
use pricing_core::model::{Contact, RegulatoryClass, TripType, VehicleCategory};
use pricing_core::pricing::{compute_price, PricingEngineContext, PricingRequest};
use pricing_core::zone::{PricingZoneSet, Zone, ZoneShape};

#[derive(Parser)]
#[command(name = "pricing_cli", about = "Price a demo trip against an in-memory fixture tenant")]
struct Cli {
    #[arg(long, allow_hyphen_values = true)]
    pickup_lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pickup_lng: f64,
    #[arg(long, allow_hyphen_values = true)]
    dropoff_lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    dropoff_lng: f64,
    #[arg(long)]
    distance_km: Option<f64>,
    #[arg(long)]
    duration_minutes: Option<f64>,
}

fn fixture_zones() -> PricingZoneSet {
    PricingZoneSet::new(vec![Zone {
        id: "cdg".into(),
        code: "CDG".into(),
        name: "Charles de Gaulle".into(),
        shape: ZoneShape::Radius { center: GeoPoint::new(49.0097, 2.5479), radius_km: 10.0 },
        is_active: true,
        price_multiplier: Some(1.2),
        priority: Some(10),
        fixed_parking_surcharge: Some(5.0),
        fixed_access_fee: None,
    }])
}

fn fixture_category() -> VehicleCategory {
    VehicleCategory {
        id: "sedan".into(),
        code: "SEDAN".into(),
        price_multiplier: 1.0,
        default_rate_per_km: None,
        default_rate_per_hour: None,
        regulatory_class: RegulatoryClass::Light,
        fuel_type: "diesel".into(),
    }
}

fn fixture_contact() -> Contact {
    Contact { id: "demo-contact".into(), is_partner: false, partner_contract: None }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let contact = fixture_contact();
    let category = fixture_category();
    let zones = fixture_zones();
    let settings = OrganizationPricingSettings {
        base_rate_per_km: Decimal::new(18, 1),
        base_rate_per_hour: Decimal::new(45, 0),
        target_margin_percent: Decimal::new(20, 0),
        ..Default::default()
    };

    let ctx = PricingEngineContext {
        contact: &contact,
        vehicle_category: &category,
        zones: &zones,
        zone_conflict_strategy: None,
        settings: &settings,
        advanced_rates: &[],
        seasonal_multipliers: &[],
    };

    let request = PricingRequest {
        contact_id: contact.id.clone(),
        pickup: GeoPoint::new(cli.pickup_lat, cli.pickup_lng),
        dropoff: GeoPoint::new(cli.dropoff_lat, cli.dropoff_lng),
        vehicle_category_id: category.id.clone(),
        trip_type: TripType::Transfer,
        pickup_at: None,
        estimated_distance_km: cli.distance_km,
        estimated_duration_minutes: cli.duration_minutes,
        route_polyline: None,
    };

    match compute_price(&request, &ctx) {
        Ok(result) => {
            let json = serde_json::to_string_pretty(&result).expect("result is serializable");
            println!("{json}");
        }
        Err(error) => {
            tracing::error!(%error, "failed to price trip");
            std::process::exit(1);
        }
    }
}
