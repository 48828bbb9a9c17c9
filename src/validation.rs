// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::errors::ZoneError;
use crate::models::RawFeature;
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Geometry, MultiPolygon, Polygon, RemoveRepeatedPoints, Validation};
use tracing::warn;

/// A feature that survived validation. Geometry is a valid MultiPolygon in
/// whatever CRS the feature arrived in.
#[derive(Clone, Debug)]
pub struct CleanFeature {
    pub id: String,
    pub class_code: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

pub struct ValidationOutcome {
    pub accepted: Vec<CleanFeature>,
    pub rejected: Vec<ZoneError>,
}

/// Repair-or-reject every feature. Same input always gives the same output;
/// nothing is dropped without a matching entry in `rejected`.
pub fn validate_features(
    features: Vec<RawFeature>,
    sliver_tolerance_sq_m: f64,
) -> ValidationOutcome {
    let mut accepted = Vec::with_capacity(features.len());
    let mut rejected = Vec::new();

    for feature in features {
        let multi = match as_multi_polygon(&feature) {
            Ok(multi) => multi,
            Err(err) => {
                warn!("rejecting feature {}: {}", feature.id, err);
                rejected.push(err);
                continue;
            }
        };

        match repair_multi_polygon(&multi, sliver_tolerance_sq_m) {
            Ok(geometry) => accepted.push(CleanFeature {
                id: feature.id,
                class_code: feature.class_code,
                geometry,
            }),
            Err(reason) => {
                warn!("rejecting feature {}: {}", feature.id, reason);
                rejected.push(ZoneError::Geometry {
                    feature: feature.id,
                    reason,
                });
            }
        }
    }

    ValidationOutcome { accepted, rejected }
}

fn as_multi_polygon(feature: &RawFeature) -> Result<MultiPolygon<f64>, ZoneError> {
    match &feature.geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon.clone()])),
        Geometry::MultiPolygon(multi) => Ok(multi.clone()),
        other => Err(ZoneError::Geometry {
            feature: feature.id.clone(),
            reason: format!("expected polygonal geometry, got {}", geometry_kind(other)),
        }),
    }
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Deterministic repair ladder: drop rings too short to close, strip repeated
/// points, re-orient, then let a self-union normalize self-intersections.
/// Returns the reason string on the rare geometry that is still invalid after
/// all of that.
pub fn repair_multi_polygon(
    multi: &MultiPolygon<f64>,
    sliver_tolerance_sq_m: f64,
) -> Result<MultiPolygon<f64>, String> {
    let closable: Vec<Polygon<f64>> = multi
        .iter()
        .filter(|polygon| polygon.exterior().0.len() >= 4)
        .map(|polygon| {
            Polygon::new(
                polygon.exterior().clone(),
                polygon
                    .interiors()
                    .iter()
                    .filter(|ring| ring.0.len() >= 4)
                    .cloned()
                    .collect(),
            )
        })
        .collect();

    let cleaned = MultiPolygon::new(closable)
        .remove_repeated_points()
        .orient(Direction::Default);

    let normalized = if cleaned.is_valid() {
        cleaned
    } else {
        // boolean-op round trip rebuilds the ring set from scratch
        let unioned = cleaned.union(&cleaned);
        if !unioned.is_valid() {
            return Err("self-intersections survived boolean normalization".to_string());
        }
        unioned
    };

    Ok(drop_slivers(normalized, sliver_tolerance_sq_m))
}

fn drop_slivers(multi: MultiPolygon<f64>, sliver_tolerance_sq_m: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(
        multi
            .into_iter()
            .filter(|polygon| polygon.unsigned_area() > sliver_tolerance_sq_m)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, polygon};

    fn feature(id: &str, geometry: Geometry<f64>) -> RawFeature {
        RawFeature {
            id: id.to_string(),
            class_code: None,
            geometry,
        }
    }

    fn unit_square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ]
    }

    #[test]
    fn valid_polygon_passes_through() {
        let outcome = validate_features(
            vec![feature("a", Geometry::Polygon(unit_square()))],
            0.5,
        );
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());
        let area = outcome.accepted[0].geometry.unsigned_area();
        assert!((area - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn bowtie_is_repaired_not_dropped() {
        // self-intersecting "bowtie" ring
        let bowtie = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 100.0, y: 100.0 },
                Coord { x: 100.0, y: 0.0 },
                Coord { x: 0.0, y: 100.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        let outcome = validate_features(vec![feature("bowtie", Geometry::Polygon(bowtie))], 0.5);
        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.accepted[0].geometry.is_valid());
        assert!(outcome.accepted[0].geometry.unsigned_area() > 0.0);
    }

    #[test]
    fn non_polygonal_feature_is_reported() {
        let outcome = validate_features(
            vec![
                feature("ok", Geometry::Polygon(unit_square())),
                feature("pt", Geometry::Point(geo::Point::new(1.0, 2.0))),
            ],
            0.5,
        );
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        match &outcome.rejected[0] {
            ZoneError::Geometry { feature, reason } => {
                assert_eq!(feature, "pt");
                assert!(reason.contains("Point"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn repair_is_deterministic() {
        let degenerate = MultiPolygon::new(vec![
            unit_square(),
            // degenerate two-point ring, gets dropped
            Polygon::new(
                LineString::new(vec![Coord { x: 5.0, y: 5.0 }, Coord { x: 5.0, y: 5.0 }]),
                vec![],
            ),
        ]);
        let first = repair_multi_polygon(&degenerate, 0.5).unwrap();
        let second = repair_multi_polygon(&degenerate, 0.5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0.len(), 1);
    }

    #[test]
    fn slivers_below_tolerance_vanish() {
        let sliver = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 0.1),
            (x: 0.0, y: 0.1),
        ];
        let repaired =
            repair_multi_polygon(&MultiPolygon::new(vec![unit_square(), sliver]), 0.5).unwrap();
        assert_eq!(repaired.0.len(), 1);
    }
}
