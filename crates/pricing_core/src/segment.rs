//! Route segmenter: attribute distance/duration/multiplier to each zone a
//! polyline traverses, or fall back to a zone-only approximation when no
//! polyline is available (spec §4.4).

use serde::{Deserialize, Serialize};

use crate::geo::{
    decode_polyline, find_crossing_fraction, haversine_km, interpolate, simplify_polyline,
    GeoPoint, DEFAULT_SIMPLIFY_THRESHOLD_KM,
};
use crate::money::round3;
use crate::zone::{ConflictStrategy, PricingZoneSet, Zone};
use rust_decimal::prelude::ToPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentationMethod {
    Polyline,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSegment {
    pub zone_id: Option<String>,
    pub zone_code: Option<String>,
    pub zone_name: Option<String>,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub price_multiplier: f64,
    pub surcharges_applied: f64,
    pub entry_point: Option<GeoPoint>,
    pub exit_point: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegmentation {
    pub segments: Vec<ZoneSegment>,
    pub weighted_multiplier: f64,
    pub total_surcharges: f64,
    pub segmentation_method: SegmentationMethod,
}

fn zone_label(zone: Option<&Zone>) -> (Option<String>, Option<String>, Option<String>, f64) {
    match zone {
        Some(z) => (
            Some(z.id.clone()),
            Some(z.code.clone()),
            Some(z.name.clone()),
            z.effective_multiplier(),
        ),
        None => (None, None, None, 1.0),
    }
}

fn weighted_multiplier(segments: &[ZoneSegment]) -> f64 {
    let total_dist: f64 = segments.iter().map(|s| s.distance_km).sum();
    if total_dist <= 0.0 {
        return 1.0;
    }
    let weighted: f64 = segments
        .iter()
        .map(|s| s.distance_km * s.price_multiplier)
        .sum();
    round3(crate::money::decimal_from_f64(weighted / total_dist))
        .to_f64()
        .unwrap_or(1.0)
}

/// Segment `polyline` by the zones it traverses. `total_duration_minutes`
/// is prorated across segments by distance fraction (uniform fallback when
/// the total is 0).
pub fn segment_route(
    polyline: &str,
    zones: &PricingZoneSet,
    total_duration_minutes: f64,
    strategy: Option<ConflictStrategy>,
) -> RouteSegmentation {
    let decoded = decode_polyline(polyline);
    let points = simplify_polyline(&decoded, DEFAULT_SIMPLIFY_THRESHOLD_KM);

    // zone_id (or None for "outside any zone") -> accumulated state, in first-seen order.
    let mut order: Vec<Option<String>> = Vec::new();
    let mut distances: std::collections::HashMap<Option<String>, f64> = std::collections::HashMap::new();
    let mut entry_points: std::collections::HashMap<Option<String>, GeoPoint> = std::collections::HashMap::new();
    let mut exit_points: std::collections::HashMap<Option<String>, GeoPoint> = std::collections::HashMap::new();

    let classify = |p: GeoPoint| zones.classify_point(p, strategy);

    if points.len() >= 2 {
        for w in points.windows(2) {
            let (a, b) = (w[0], w[1]);
            let zone_a = classify(a).map(|z| z.id.clone());
            let zone_b = classify(b).map(|z| z.id.clone());

            if zone_a == zone_b {
                let key = zone_a.clone();
                let dist = haversine_km(a, b);
                *distances.entry(key.clone()).or_insert(0.0) += dist;
                if !order.contains(&key) {
                    order.push(key.clone());
                    entry_points.insert(key.clone(), a);
                }
                exit_points.insert(key.clone(), b);
            } else {
                // Boundary crossing: split the segment at the approximate crossing.
                let predicate = |p: GeoPoint| classify(p).map(|z| z.id.clone()) == zone_a;
                let t = find_crossing_fraction(a, b, predicate);
                let crossing = interpolate(a, b, t);

                let dist_a = haversine_km(a, crossing);
                let dist_b = haversine_km(crossing, b);

                *distances.entry(zone_a.clone()).or_insert(0.0) += dist_a;
                if !order.contains(&zone_a) {
                    order.push(zone_a.clone());
                    entry_points.insert(zone_a.clone(), a);
                }
                exit_points.insert(zone_a.clone(), crossing);

                *distances.entry(zone_b.clone()).or_insert(0.0) += dist_b;
                if !order.contains(&zone_b) {
                    order.push(zone_b.clone());
                    entry_points.insert(zone_b.clone(), crossing);
                }
                exit_points.insert(zone_b.clone(), b);
            }
        }
    }

    let total_dist: f64 = distances.values().sum();
    let mut segments = Vec::new();
    let mut total_surcharges = 0.0;

    for key in &order {
        let dist = *distances.get(key).unwrap_or(&0.0);
        let duration = if total_dist > 0.0 {
            total_duration_minutes * (dist / total_dist)
        } else if !order.is_empty() {
            total_duration_minutes / order.len() as f64
        } else {
            0.0
        };
        let zone = key.as_deref().and_then(|id| zones.by_id(id));
        let (zone_id, zone_code, zone_name, multiplier) = zone_label(zone);
        let surcharge = zone.map(|z| z.total_fixed_surcharge()).unwrap_or(0.0);
        total_surcharges += surcharge;

        segments.push(ZoneSegment {
            zone_id,
            zone_code,
            zone_name,
            distance_km: dist,
            duration_minutes: duration,
            price_multiplier: multiplier,
            surcharges_applied: surcharge,
            entry_point: entry_points.get(key).copied(),
            exit_point: exit_points.get(key).copied(),
        });
    }

    let weighted = weighted_multiplier(&segments);

    RouteSegmentation {
        segments,
        weighted_multiplier: weighted,
        total_surcharges,
        segmentation_method: SegmentationMethod::Polyline,
    }
}

/// Fallback path when no polyline is available: one segment if pickup and
/// dropoff share a zone, otherwise two segments split 50/50.
pub fn fallback_segment(
    pickup_zone: Option<&Zone>,
    dropoff_zone: Option<&Zone>,
    total_distance_km: f64,
    total_duration_minutes: f64,
) -> RouteSegmentation {
    let same_zone = match (pickup_zone, dropoff_zone) {
        (Some(a), Some(b)) => a.id == b.id,
        (None, None) => true,
        _ => false,
    };

    let segments = if same_zone {
        let (zone_id, zone_code, zone_name, multiplier) = zone_label(pickup_zone);
        vec![ZoneSegment {
            zone_id,
            zone_code,
            zone_name,
            distance_km: total_distance_km,
            duration_minutes: total_duration_minutes,
            price_multiplier: multiplier,
            surcharges_applied: pickup_zone.map(|z| z.total_fixed_surcharge()).unwrap_or(0.0),
            entry_point: None,
            exit_point: None,
        }]
    } else {
        let (id_a, code_a, name_a, mult_a) = zone_label(pickup_zone);
        let (id_b, code_b, name_b, mult_b) = zone_label(dropoff_zone);
        vec![
            ZoneSegment {
                zone_id: id_a,
                zone_code: code_a,
                zone_name: name_a,
                distance_km: total_distance_km / 2.0,
                duration_minutes: total_duration_minutes / 2.0,
                price_multiplier: mult_a,
                surcharges_applied: pickup_zone.map(|z| z.total_fixed_surcharge()).unwrap_or(0.0),
                entry_point: None,
                exit_point: None,
            },
            ZoneSegment {
                zone_id: id_b,
                zone_code: code_b,
                zone_name: name_b,
                distance_km: total_distance_km / 2.0,
                duration_minutes: total_duration_minutes / 2.0,
                price_multiplier: mult_b,
                surcharges_applied: dropoff_zone.map(|z| z.total_fixed_surcharge()).unwrap_or(0.0),
                entry_point: None,
                exit_point: None,
            },
        ]
    };

    let weighted = weighted_multiplier(&segments);
    let total_surcharges = segments.iter().map(|s| s.surcharges_applied).sum();

    RouteSegmentation {
        segments,
        weighted_multiplier: weighted,
        total_surcharges,
        segmentation_method: SegmentationMethod::Fallback,
    }
}

/// Concentric-ring interpolation: when pickup/dropoff sit in RADIUS zones
/// sharing a center, emit an ordered segment per shell crossed between the
/// two distances from that shared center, outward or inward depending on
/// which endpoint is farther. Appends an `OUTSIDE_ZONE` entry
/// (`priceMultiplier = 1.0`) when the route exits the outermost ring.
///
/// Only reached from the fallback path by explicit caller choice — see
/// DESIGN.md for why this is not wired into the default dynamic-pricing
/// flow.
pub fn concentric_ring_segments(
    rings: &[Zone],
    pickup_distance_km: f64,
    dropoff_distance_km: f64,
    total_distance_km: f64,
    total_duration_minutes: f64,
) -> RouteSegmentation {
    let mut sorted: Vec<&Zone> = rings.iter().collect();
    sorted.sort_by(|a, b| {
        let ra = match &a.shape {
            crate::zone::ZoneShape::Radius { radius_km, .. } => *radius_km,
            _ => f64::MAX,
        };
        let rb = match &b.shape {
            crate::zone::ZoneShape::Radius { radius_km, .. } => *radius_km,
            _ => f64::MAX,
        };
        ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
    });

    let outward = dropoff_distance_km > pickup_distance_km;
    if !outward {
        sorted.reverse();
    }

    let (near, far) = if outward {
        (pickup_distance_km, dropoff_distance_km)
    } else {
        (dropoff_distance_km, pickup_distance_km)
    };

    let mut segments = Vec::new();
    let mut prev_boundary = near;
    let crossed_shells: Vec<&Zone> = sorted
        .iter()
        .filter(|z| match &z.shape {
            crate::zone::ZoneShape::Radius { radius_km, .. } => *radius_km > near && *radius_km <= far,
            _ => false,
        })
        .copied()
        .collect();

    let outermost_radius = sorted
        .iter()
        .filter_map(|z| match &z.shape {
            crate::zone::ZoneShape::Radius { radius_km, .. } => Some(*radius_km),
            _ => None,
        })
        .fold(0.0f64, f64::max);

    for shell in &crossed_shells {
        let radius_km = match &shell.shape {
            crate::zone::ZoneShape::Radius { radius_km, .. } => *radius_km,
            _ => continue,
        };
        let segment_dist = (radius_km - prev_boundary).max(0.0);
        segments.push(ZoneSegment {
            zone_id: Some(shell.id.clone()),
            zone_code: Some(shell.code.clone()),
            zone_name: Some(shell.name.clone()),
            distance_km: segment_dist,
            duration_minutes: 0.0,
            price_multiplier: shell.effective_multiplier(),
            surcharges_applied: shell.total_fixed_surcharge(),
            entry_point: None,
            exit_point: None,
        });
        prev_boundary = radius_km;
    }

    if far > outermost_radius {
        segments.push(ZoneSegment {
            zone_id: None,
            zone_code: Some("OUTSIDE_ZONE".into()),
            zone_name: Some("Outside zone".into()),
            distance_km: (far - outermost_radius).max(0.0),
            duration_minutes: 0.0,
            price_multiplier: 1.0,
            surcharges_applied: 0.0,
            entry_point: None,
            exit_point: None,
        });
    }

    if !outward {
        segments.reverse();
    }

    let accounted: f64 = segments.iter().map(|s| s.distance_km).sum();
    if accounted > 0.0 {
        let scale = total_distance_km / accounted;
        for s in &mut segments {
            s.distance_km *= scale;
            s.duration_minutes = total_duration_minutes * (s.distance_km / total_distance_km.max(1e-9));
        }
    }

    let weighted = weighted_multiplier(&segments);
    let total_surcharges = segments.iter().map(|s| s.surcharges_applied).sum();

    RouteSegmentation {
        segments,
        weighted_multiplier: weighted,
        total_surcharges,
        segmentation_method: SegmentationMethod::Fallback,
    }
}
