//! Corridor buffer: build a polygon buffer around a polyline centerline and
//! compute a route's intersection with it (spec §4.3).
//!
//! The buffer is a plain result value (an outer ring of points) rather than
//! a builder or handle, the same way a route result carries its
//! distance/waypoints as plain data.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::geo::{
    decode_polyline, find_crossing_fraction, interpolate, point_in_polygon, polyline_length_km,
    GeoPoint,
};
use crate::money::round3;
use rust_decimal::prelude::ToPrimitive;

pub const MIN_BUFFER_METERS: f64 = 100.0;
pub const MAX_BUFFER_METERS: f64 = 5000.0;

/// Degrees of latitude per kilometer, used to convert a meter buffer into a
/// local-degree offset. Accurate enough at corridor scale; longitude offset
/// is additionally scaled by `cos(lat)`.
const KM_PER_DEGREE_LAT: f64 = 111.32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorridorBuffer {
    /// Outer ring of the buffer polygon, `[lng, lat]` order.
    pub polygon: Vec<[f64; 2]>,
    pub centerline_length_km: f64,
    pub midpoint: GeoPoint,
    pub bbox: BoundingBox,
}

fn offset_point(a: GeoPoint, b: GeoPoint, buffer_km: f64, side: f64) -> GeoPoint {
    let dlat = b.lat - a.lat;
    let dlng = b.lng - a.lng;
    let len = (dlat * dlat + dlng * dlng).sqrt();
    if len == 0.0 {
        return a;
    }
    // Perpendicular unit vector in degree-space, then scale to `buffer_km`.
    let (perp_lat, perp_lng) = (-dlng / len, dlat / len);
    let lat_offset = perp_lat * (buffer_km / KM_PER_DEGREE_LAT) * side;
    let cos_lat = a.lat.to_radians().cos().max(0.01);
    let lng_offset = perp_lng * (buffer_km / (KM_PER_DEGREE_LAT * cos_lat)) * side;
    GeoPoint::new(a.lat + lat_offset, a.lng + lng_offset)
}

/// Build a polygon buffer around the centerline decoded from
/// `encoded_polyline`, at `buffer_meters` width (must be in `[100, 5000]`).
pub fn build_corridor_buffer(encoded_polyline: &str, buffer_meters: f64) -> CoreResult<CorridorBuffer> {
    if !(MIN_BUFFER_METERS..=MAX_BUFFER_METERS).contains(&buffer_meters) {
        return Err(CoreError::InvalidConfig(format!(
            "bufferMeters must be within [{MIN_BUFFER_METERS}, {MAX_BUFFER_METERS}], got {buffer_meters}"
        )));
    }
    let points = decode_polyline(encoded_polyline);
    if points.len() < 2 {
        return Err(CoreError::InvalidGeometry(
            "polyline must decode to at least 2 points".into(),
        ));
    }
    let buffer_km = buffer_meters / 1000.0;

    let mut left_side = Vec::with_capacity(points.len());
    let mut right_side = Vec::with_capacity(points.len());
    for w in points.windows(2) {
        left_side.push(offset_point(w[0], w[1], buffer_km, 1.0));
        right_side.push(offset_point(w[0], w[1], buffer_km, -1.0));
    }
    // Close the buffer at the final point too, reusing the last segment's direction.
    let last_pair = &points[points.len() - 2..];
    left_side.push(offset_point(last_pair[1], last_pair[0], buffer_km, -1.0));
    right_side.push(offset_point(last_pair[1], last_pair[0], buffer_km, 1.0));

    let mut polygon: Vec<[f64; 2]> = Vec::with_capacity(left_side.len() + right_side.len() + 1);
    polygon.extend(left_side.iter().map(|p| [p.lng, p.lat]));
    polygon.extend(right_side.iter().rev().map(|p| [p.lng, p.lat]));
    if polygon.first() != polygon.last() {
        polygon.push(polygon[0]);
    }

    let centerline_length_km = polyline_length_km(&points);
    let mid_index = points.len() / 2;
    let midpoint = points[mid_index];

    let bbox = BoundingBox {
        min_lat: points.iter().map(|p| p.lat).fold(f64::MAX, f64::min),
        max_lat: points.iter().map(|p| p.lat).fold(f64::MIN, f64::max),
        min_lng: points.iter().map(|p| p.lng).fold(f64::MAX, f64::min),
        max_lng: points.iter().map(|p| p.lng).fold(f64::MIN, f64::max),
    };

    Ok(CorridorBuffer {
        polygon,
        centerline_length_km,
        midpoint,
        bbox,
    })
}

pub fn is_point_in_corridor(point: GeoPoint, corridor: &CorridorBuffer) -> bool {
    point_in_polygon(point, &corridor.polygon)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorridorIntersection {
    pub distance_km: f64,
    pub entry_point: GeoPoint,
    pub exit_point: GeoPoint,
    /// Percentage of the total route length this segment represents, rounded to 3dp.
    pub percentage_of_route: f64,
}

/// Iterate `route_polyline` and find every disjoint segment inside
/// `corridor`, returning `{distanceKm, entryPoint, exitPoint, percentageOfRoute}`
/// for each (spec §4.3).
pub fn corridor_intersections(
    route_polyline: &str,
    corridor: &CorridorBuffer,
    route_length_km: f64,
) -> Vec<CorridorIntersection> {
    let points = decode_polyline(route_polyline);
    if points.len() < 2 {
        return Vec::new();
    }

    let mut intersections = Vec::new();
    let mut current_entry: Option<GeoPoint> = None;
    let mut current_distance = 0.0f64;

    let inside = |p: GeoPoint| is_point_in_corridor(p, corridor);

    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let (a_in, b_in) = (inside(a), inside(b));
        let segment_len = crate::geo::haversine_km(a, b);

        match (a_in, b_in, current_entry) {
            (true, true, Some(_)) => {
                current_distance += segment_len;
            }
            (true, true, None) => {
                current_entry = Some(a);
                current_distance = segment_len;
            }
            (false, true, None) => {
                let t = find_crossing_fraction(a, b, inside);
                let crossing = interpolate(a, b, t);
                current_entry = Some(crossing);
                current_distance = crate::geo::haversine_km(crossing, b);
            }
            (true, false, Some(entry)) => {
                let t = find_crossing_fraction(a, b, inside);
                let crossing = interpolate(a, b, t);
                current_distance += crate::geo::haversine_km(a, crossing);
                intersections.push(build_intersection(entry, crossing, current_distance, route_length_km));
                current_entry = None;
                current_distance = 0.0;
            }
            _ => {}
        }
    }

    // Route ended while still inside the corridor.
    if let Some(entry) = current_entry {
        let exit = points.last().copied().unwrap();
        intersections.push(build_intersection(entry, exit, current_distance, route_length_km));
    }

    intersections
}

fn build_intersection(
    entry: GeoPoint,
    exit: GeoPoint,
    distance_km: f64,
    route_length_km: f64,
) -> CorridorIntersection {
    let pct = if route_length_km > 0.0 {
        distance_km / route_length_km * 100.0
    } else {
        0.0
    };
    CorridorIntersection {
        distance_km,
        entry_point: entry,
        exit_point: exit,
        percentage_of_route: round3(crate::money::decimal_from_f64(pct))
            .to_f64()
            .unwrap_or(pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::encode_polyline;

    fn straight_line() -> String {
        let points = vec![
            GeoPoint::new(48.8566, 2.3522),
            GeoPoint::new(48.8666, 2.3522),
            GeoPoint::new(48.8766, 2.3522),
        ];
        encode_polyline(&points)
    }

    #[test]
    fn midpoint_is_contained_at_500m_buffer() {
        let line = straight_line();
        let corridor = build_corridor_buffer(&line, 500.0).expect("buffer");
        assert!(is_point_in_corridor(corridor.midpoint, &corridor));
    }

    #[test]
    fn out_of_range_buffer_fails() {
        assert!(build_corridor_buffer(&straight_line(), 50.0).is_err());
        assert!(build_corridor_buffer(&straight_line(), 6000.0).is_err());
    }

    #[test]
    fn short_polyline_is_rejected() {
        let single = encode_polyline(&[GeoPoint::new(48.0, 2.0)]);
        assert!(build_corridor_buffer(&single, 500.0).is_err());
    }
}
