//! Zone engine: classify a point into tenant-defined pricing zones and
//! resolve conflicts when several zones contain it (spec §4.2).
//!
//! The conflict-strategy dispatch uses small pure scoring helpers composed
//! by a single chooser function, rather than a class hierarchy per
//! strategy.

use serde::{Deserialize, Serialize};

use crate::geo::{haversine_km, point_in_polygon, point_in_radius, polygon_centroid, GeoPoint};

/// Fixed match radius for [`ZoneShape::Point`] zones (spec §3).
pub const POINT_ZONE_RADIUS_KM: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "UPPERCASE")]
pub enum ZoneShape {
    /// GeoJSON outer ring in `[lng, lat]` order, closed, >= 3 points.
    Polygon { ring: Vec<[f64; 2]> },
    Radius { center: GeoPoint, radius_km: f64 },
    Point { center: GeoPoint },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub code: String,
    pub name: String,
    pub shape: ZoneShape,
    pub is_active: bool,
    pub price_multiplier: Option<f64>,
    pub priority: Option<i32>,
    pub fixed_parking_surcharge: Option<f64>,
    pub fixed_access_fee: Option<f64>,
}

impl Zone {
    pub fn effective_multiplier(&self) -> f64 {
        self.price_multiplier.unwrap_or(1.0)
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    pub fn total_fixed_surcharge(&self) -> f64 {
        self.fixed_parking_surcharge.unwrap_or(0.0) + self.fixed_access_fee.unwrap_or(0.0)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        match &self.shape {
            ZoneShape::Polygon { ring } => point_in_polygon(point, ring),
            ZoneShape::Radius { center, radius_km } => point_in_radius(point, *center, *radius_km),
            ZoneShape::Point { center } => point_in_radius(point, *center, POINT_ZONE_RADIUS_KM),
        }
    }

    /// Radius used for `RADIUS` specificity ordering; `POINT` zones sort as
    /// radius 0 (most specific), polygons have no radius.
    fn specificity_radius(&self) -> Option<f64> {
        match &self.shape {
            ZoneShape::Point { .. } => Some(0.0),
            ZoneShape::Radius { radius_km, .. } => Some(*radius_km),
            ZoneShape::Polygon { .. } => None,
        }
    }

    fn shape_rank(&self) -> u8 {
        match &self.shape {
            ZoneShape::Point { .. } => 0,
            ZoneShape::Radius { .. } => 1,
            ZoneShape::Polygon { .. } => 2,
        }
    }

    pub fn center(&self) -> GeoPoint {
        match &self.shape {
            ZoneShape::Point { center } | ZoneShape::Radius { center, .. } => *center,
            ZoneShape::Polygon { ring } => polygon_centroid(ring),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictStrategy {
    Priority,
    MostExpensive,
    Closest,
    Combined,
}

/// A tenant-scoped collection of zones.
#[derive(Debug, Clone, Default)]
pub struct PricingZoneSet {
    pub zones: Vec<Zone>,
}

impl PricingZoneSet {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    fn active_matches(&self, point: GeoPoint) -> Vec<&Zone> {
        self.zones
            .iter()
            .filter(|z| z.is_active && z.contains(point))
            .collect()
    }

    /// Default specificity order: POINT first, then RADIUS ascending by
    /// radius, then POLYGON, with original collection order as a stable
    /// tie-break.
    fn sort_by_specificity(matches: &mut [&Zone]) {
        matches.sort_by(|a, b| {
            a.shape_rank().cmp(&b.shape_rank()).then_with(|| {
                match (a.specificity_radius(), b.specificity_radius()) {
                    (Some(ra), Some(rb)) => ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal),
                    _ => std::cmp::Ordering::Equal,
                }
            })
        });
    }

    /// Ordered list of zones containing `point`; always a subset of the zone
    /// set, ordered by `strategy` (or default specificity when absent).
    pub fn classify_point_all(
        &self,
        point: GeoPoint,
        strategy: Option<ConflictStrategy>,
    ) -> Vec<&Zone> {
        let mut matches = self.active_matches(point);
        if matches.len() <= 1 {
            return matches;
        }

        match strategy {
            None => Self::sort_by_specificity(&mut matches),
            Some(ConflictStrategy::Priority) => {
                matches.sort_by(|a, b| b.effective_priority().cmp(&a.effective_priority()))
            }
            Some(ConflictStrategy::MostExpensive) => matches.sort_by(|a, b| {
                b.effective_multiplier()
                    .partial_cmp(&a.effective_multiplier())
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            Some(ConflictStrategy::Closest) => matches.sort_by(|a, b| {
                let da = haversine_km(point, a.center());
                let db = haversine_km(point, b.center());
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            }),
            Some(ConflictStrategy::Combined) => matches.sort_by(|a, b| {
                b.effective_priority()
                    .cmp(&a.effective_priority())
                    .then_with(|| {
                        b.effective_multiplier()
                            .partial_cmp(&a.effective_multiplier())
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
            }),
        }
        matches
    }

    /// The single winning zone, i.e. the first element of
    /// [`classify_point_all`], or `None`.
    pub fn classify_point(
        &self,
        point: GeoPoint,
        strategy: Option<ConflictStrategy>,
    ) -> Option<&Zone> {
        self.classify_point_all(point, strategy).into_iter().next()
    }

    pub fn by_id(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdg_and_paris40() -> PricingZoneSet {
        PricingZoneSet::new(vec![
            Zone {
                id: "cdg".into(),
                code: "CDG".into(),
                name: "Charles de Gaulle".into(),
                shape: ZoneShape::Radius {
                    center: GeoPoint::new(49.0097, 2.5479),
                    radius_km: 10.0,
                },
                is_active: true,
                price_multiplier: Some(1.2),
                priority: Some(10),
                fixed_parking_surcharge: None,
                fixed_access_fee: None,
            },
            Zone {
                id: "paris40".into(),
                code: "PARIS_40".into(),
                name: "Paris 40km".into(),
                shape: ZoneShape::Radius {
                    center: GeoPoint::new(48.8566, 2.3522),
                    radius_km: 40.0,
                },
                is_active: true,
                price_multiplier: Some(1.3),
                priority: Some(5),
                fixed_parking_surcharge: None,
                fixed_access_fee: None,
            },
        ])
    }

    #[test]
    fn classify_point_all_is_subset_and_first_matches_single() {
        let set = cdg_and_paris40();
        let point = GeoPoint::new(49.0097, 2.5479);
        let all = set.classify_point_all(point, None);
        let single = set.classify_point(point, None);
        assert!(all.iter().all(|z| set.zones.iter().any(|zz| zz.id == z.id)));
        assert_eq!(single.map(|z| z.id.clone()), all.first().map(|z| z.id.clone()));
    }

    #[test]
    fn priority_strategy_picks_cdg() {
        let set = cdg_and_paris40();
        let point = GeoPoint::new(49.0097, 2.5479);
        let winner = set.classify_point(point, Some(ConflictStrategy::Priority)).unwrap();
        assert_eq!(winner.id, "cdg");
    }

    #[test]
    fn closest_strategy_picks_cdg() {
        let set = cdg_and_paris40();
        let point = GeoPoint::new(49.0097, 2.5479);
        let winner = set.classify_point(point, Some(ConflictStrategy::Closest)).unwrap();
        assert_eq!(winner.id, "cdg");
    }

    #[test]
    fn most_expensive_strategy_picks_paris40() {
        let set = cdg_and_paris40();
        let point = GeoPoint::new(49.0097, 2.5479);
        let winner = set
            .classify_point(point, Some(ConflictStrategy::MostExpensive))
            .unwrap();
        assert_eq!(winner.id, "paris40");
    }

    #[test]
    fn no_match_returns_none() {
        let set = cdg_and_paris40();
        let far = GeoPoint::new(10.0, 10.0);
        assert!(set.classify_point(far, None).is_none());
        assert!(set.classify_point_all(far, None).is_empty());
    }
}
