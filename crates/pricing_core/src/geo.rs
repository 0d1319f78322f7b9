//! Geo primitives: Haversine distance, point-in-polygon, point-in-radius,
//! polyline decode/simplify, and zone-crossing interpolation (spec §4.1).
//!
//! Zones here are literal GeoJSON polygons and radii rather than a hex
//! grid, so the primitives operate directly on [`GeoPoint`]; a global
//! `lru`-backed cache is kept for the hot pairwise-distance path the same
//! way a hex-grid distance cache would be, just keyed on two points instead
//! of two cell indices.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use lru::LruCache;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers, matching spec §4.1.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default simplification threshold for [`simplify_polyline`], in kilometers.
pub const DEFAULT_SIMPLIFY_THRESHOLD_KM: f64 = 0.05;

/// A point in WGS-84 decimal degrees. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Bit pattern key usable in a hashable cache; two equal points (even
    /// `NaN`-free floats) always produce the same key.
    fn cache_key(self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }
}

fn haversine_uncached(a: GeoPoint, b: GeoPoint) -> f64 {
    if a == b {
        return 0.0;
    }
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

type DistanceKey = ((u64, u64), (u64, u64));

fn distance_cache() -> &'static Mutex<LruCache<DistanceKey, f64>> {
    static CACHE: OnceLock<Mutex<LruCache<DistanceKey, f64>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(
            NonZeroUsize::new(10_000).expect("cache size must be non-zero"),
        ))
    })
}

/// Haversine distance in kilometers. Returns 0 for identical points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (ka, kb) = (a.cache_key(), b.cache_key());
    let key = if ka <= kb { (ka, kb) } else { (kb, ka) };

    let mut cache = distance_cache().lock().unwrap();
    *cache.get_or_insert(key, || haversine_uncached(a, b))
}

/// Point-in-radius: `haversine(point, center) <= radius_km` (inclusive).
pub fn point_in_radius(point: GeoPoint, center: GeoPoint, radius_km: f64) -> bool {
    haversine_km(point, center) <= radius_km
}

/// Ray-casting point-in-polygon test over an outer ring given in `[lng, lat]`
/// order (GeoJSON convention, per spec §3). Rings with fewer than 3 points
/// never contain anything. Behavior on the boundary is deterministic but
/// unspecified (spec §4.1).
pub fn point_in_polygon(point: GeoPoint, ring: &[[f64; 2]]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let n = ring.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        let intersects =
            ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Centroid of a polygon ring (`[lng, lat]` order), used by the `CLOSEST`
/// zone-conflict strategy. Falls back to the arithmetic mean of vertices
/// (adequate for the roughly-convex tenant zones this engine deals with).
pub fn polygon_centroid(ring: &[[f64; 2]]) -> GeoPoint {
    if ring.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }
    let (sum_lng, sum_lat) = ring.iter().fold((0.0, 0.0), |(sl, sa), p| (sl + p[0], sa + p[1]));
    let n = ring.len() as f64;
    GeoPoint::new(sum_lat / n, sum_lng / n)
}

/// Decode a Google-encoded polyline string into an ordered sequence of points.
pub fn decode_polyline(encoded: &str) -> Vec<GeoPoint> {
    let mut points = Vec::new();
    let bytes = encoded.as_bytes();
    let mut index = 0usize;
    let (mut lat, mut lng) = (0i64, 0i64);

    while index < bytes.len() {
        let Some(dlat) = decode_varint(bytes, &mut index) else {
            break;
        };
        lat += dlat;
        let Some(dlng) = decode_varint(bytes, &mut index) else {
            break;
        };
        lng += dlng;
        points.push(GeoPoint::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }
    points
}

fn decode_varint(bytes: &[u8], index: &mut usize) -> Option<i64> {
    if *index >= bytes.len() {
        return None;
    }
    let mut result: i64 = 0;
    let mut shift = 0u32;
    loop {
        if *index >= bytes.len() {
            return None;
        }
        let b = bytes[*index] as i64 - 63;
        *index += 1;
        result |= (b & 0x1f) << shift;
        shift += 5;
        if b & 0x20 == 0 {
            break;
        }
    }
    let delta = if result & 1 != 0 { !(result >> 1) } else { result >> 1 };
    Some(delta)
}

/// Encode a sequence of points as a Google-style polyline string. Used by
/// tests and by callers that need to round-trip a simplified route.
pub fn encode_polyline(points: &[GeoPoint]) -> String {
    let mut out = String::new();
    let (mut prev_lat, mut prev_lng) = (0i64, 0i64);
    for p in points {
        let lat = (p.lat * 1e5).round() as i64;
        let lng = (p.lng * 1e5).round() as i64;
        encode_varint(lat - prev_lat, &mut out);
        encode_varint(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }
    out
}

fn encode_varint(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    loop {
        let mut chunk = (v & 0x1f) as u8;
        v >>= 5;
        if v != 0 {
            chunk |= 0x20;
        }
        out.push((chunk as u8 + 63) as char);
        if v == 0 {
            break;
        }
    }
}

/// Drop consecutive points closer than `threshold_km`, preserving the first
/// and last point of the input.
pub fn simplify_polyline(points: &[GeoPoint], threshold_km: f64) -> Vec<GeoPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for &p in &points[1..points.len() - 1] {
        let last = *out.last().unwrap();
        if haversine_km(last, p) >= threshold_km {
            out.push(p);
        }
    }
    let last_input = *points.last().unwrap();
    if out.last() != Some(&last_input) {
        out.push(last_input);
    }
    out
}

/// Total length of a polyline as the sum of consecutive Haversine distances.
pub fn polyline_length_km(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Binary-interpolate the approximate crossing point between `a` and `b`
/// where `predicate` flips value, for at most 15 iterations (spec §4.1).
/// Returns the interpolation fraction in `[0, 1]` from `a` toward `b`.
pub fn find_crossing_fraction<F>(a: GeoPoint, b: GeoPoint, predicate: F) -> f64
where
    F: Fn(GeoPoint) -> bool,
{
    let a_val = predicate(a);
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..15 {
        let mid = (lo + hi) / 2.0;
        let point = interpolate(a, b, mid);
        if predicate(point) == a_val {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Linear interpolation between two points at fraction `t` in `[0, 1]`.
/// Adequate at the short segment lengths zones and corridors operate at;
/// not a geodesic interpolation.
pub fn interpolate(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(a.lat + (b.lat - a.lat) * t, a.lng + (b.lng - a.lng) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_distance() {
        let p = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn paris_to_lyon_distance_in_range() {
        let paris = GeoPoint::new(48.8566, 2.3522);
        let lyon = GeoPoint::new(45.764, 4.8357);
        let d = haversine_km(paris, lyon);
        assert!(d > 390.0 && d < 400.0, "distance was {d}");
    }

    #[test]
    fn polygon_with_fewer_than_three_points_never_contains() {
        let ring = [[2.0, 48.0], [2.1, 48.1]];
        assert!(!point_in_polygon(GeoPoint::new(48.05, 2.05), &ring));
    }

    #[test]
    fn point_in_simple_square() {
        let ring = [
            [2.0, 48.0],
            [2.2, 48.0],
            [2.2, 48.2],
            [2.0, 48.2],
            [2.0, 48.0],
        ];
        assert!(point_in_polygon(GeoPoint::new(48.1, 2.1), &ring));
        assert!(!point_in_polygon(GeoPoint::new(49.0, 3.0), &ring));
    }

    #[test]
    fn polyline_round_trip_preserves_length() {
        let points = vec![
            GeoPoint::new(48.8566, 2.3522),
            GeoPoint::new(48.86, 2.36),
            GeoPoint::new(48.87, 2.40),
        ];
        let encoded = encode_polyline(&points);
        let decoded = decode_polyline(&encoded);
        let original_len = polyline_length_km(&points);
        let simplified = simplify_polyline(&decoded, 0.0);
        let round_trip_len = polyline_length_km(&simplified);
        let rel_err = (round_trip_len - original_len).abs() / original_len;
        assert!(rel_err < 0.001, "relative error was {rel_err}");
    }

    #[test]
    fn simplify_preserves_endpoints() {
        let points = vec![
            GeoPoint::new(48.0, 2.0),
            GeoPoint::new(48.0001, 2.0001),
            GeoPoint::new(48.0002, 2.0002),
            GeoPoint::new(49.0, 3.0),
        ];
        let simplified = simplify_polyline(&points, 0.05);
        assert_eq!(simplified.first(), points.first());
        assert_eq!(simplified.last(), points.last());
    }

    #[test]
    fn crossing_fraction_distinguishes_zones() {
        let a = GeoPoint::new(48.0, 2.0);
        let b = GeoPoint::new(49.0, 2.0);
        let boundary_lat = 48.5;
        let predicate = |p: GeoPoint| p.lat < boundary_lat;
        let t = find_crossing_fraction(a, b, predicate);
        let crossing = interpolate(a, b, t);
        assert!((crossing.lat - boundary_lat).abs() < 0.01);
    }
}
