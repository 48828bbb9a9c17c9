// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::config::EngineConfig;
use crate::coverage_stats::area_sq_miles;
use crate::errors::ZoneError;
use crate::models::{Zone, ZoneCategory, ZoningDistrict};
use crate::validation::repair_multi_polygon;
use geo::{Area, BooleanOps, MultiPolygon};
use itertools::Itertools;
use tracing::debug;

/// Validated inputs to the zone derivation, all in the projected CRS.
pub struct ZoneInputs {
    pub rail_buffer: MultiPolygon<f64>,
    pub commuter_buffer: MultiPolygon<f64>,
    pub corridors: Vec<MultiPolygon<f64>>,
    pub districts: Vec<ZoningDistrict>,
    pub boundary: MultiPolygon<f64>,
}

/// Derive the three disjoint regulatory zones.
///
/// The order is fixed. Commuter-rail coverage is taken as a difference
/// against the combined city-rail and corridor coverage, never on its own:
/// using the raw commuter buffer would re-include the overlap and the zones
/// would no longer partition. The boundary clip is the last geometric step,
/// after which the pairwise-disjoint and containment post-conditions are
/// checked. Either all three zones come back valid or the first error does.
pub fn compute_zones(
    inputs: &ZoneInputs,
    config: &EngineConfig,
) -> Result<[Zone; 3], ZoneError> {
    let tolerance = config.sliver_tolerance_sq_m;

    let corridor_union = inputs
        .corridors
        .iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, corridor| {
            acc.union(corridor)
        });
    let corridor_union = revalidate("corridor-union", corridor_union, tolerance)?;

    let transit_served = revalidate(
        "transit-served",
        inputs.rail_buffer.union(&corridor_union),
        tolerance,
    )?;

    let commuter_only = revalidate(
        "commuter-only",
        inputs.commuter_buffer.difference(&transit_served),
        tolerance,
    )?;

    let downtown_union = inputs
        .districts
        .iter()
        .filter(|district| district.class_code.starts_with(&config.downtown_class_prefix))
        .fold(MultiPolygon::new(Vec::new()), |acc, district| {
            acc.union(&district.geometry)
        });
    let downtown_union = revalidate("downtown-union", downtown_union, tolerance)?;

    let no_parking = revalidate(
        "no-parking",
        transit_served.difference(&downtown_union),
        tolerance,
    )?;

    debug!(
        "pre-clip areas sq m: no-parking {:.0}, commuter-only {:.0}, downtown {:.0}",
        no_parking.unsigned_area(),
        commuter_only.unsigned_area(),
        downtown_union.unsigned_area()
    );

    let zones = [
        clipped_zone(ZoneCategory::NoParkingRequired, &no_parking, inputs, tolerance)?,
        clipped_zone(ZoneCategory::AdminAdjustmentTransit, &commuter_only, inputs, tolerance)?,
        clipped_zone(ZoneCategory::AdminAdjustmentDowntown, &downtown_union, inputs, tolerance)?,
    ];

    check_zone_consistency(&zones, &inputs.boundary, tolerance)?;

    Ok(zones)
}

fn clipped_zone(
    category: ZoneCategory,
    geometry: &MultiPolygon<f64>,
    inputs: &ZoneInputs,
    tolerance: f64,
) -> Result<Zone, ZoneError> {
    let clipped = revalidate(
        category.as_str(),
        geometry.intersection(&inputs.boundary),
        tolerance,
    )?;
    let area_sq_mi = area_sq_miles(&clipped);
    Ok(Zone {
        category,
        geometry: clipped,
        area_sq_mi,
    })
}

fn revalidate(
    stage: &str,
    geometry: MultiPolygon<f64>,
    tolerance: f64,
) -> Result<MultiPolygon<f64>, ZoneError> {
    repair_multi_polygon(&geometry, tolerance).map_err(|reason| ZoneError::Geometry {
        feature: stage.to_string(),
        reason,
    })
}

/// Post-condition check: zones are pairwise disjoint and stay inside the
/// boundary. Violations surface with the offending geometry instead of being
/// silently re-subtracted, so upstream data defects stay visible.
pub fn check_zone_consistency(
    zones: &[Zone; 3],
    boundary: &MultiPolygon<f64>,
    tolerance: f64,
) -> Result<(), ZoneError> {
    for (first, second) in zones.iter().tuple_combinations() {
        let overlap = first.geometry.intersection(&second.geometry);
        let overlap_sq_m = overlap.unsigned_area();
        if overlap_sq_m > tolerance {
            return Err(ZoneError::ZoneOverlap {
                first: first.category,
                second: second.category,
                overlap_sq_m,
                overlap,
            });
        }
    }

    for zone in zones {
        let overflow = zone.geometry.difference(boundary);
        let overflow_sq_m = overflow.unsigned_area();
        if overflow_sq_m > tolerance {
            return Err(ZoneError::ZoneOutsideBoundary {
                category: zone.category,
                overflow_sq_m,
                overflow,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffering::disc;
    use geo::{Point, polygon};
    use std::f64::consts::PI;

    const MILE_M: f64 = 1609.344;
    const RADIUS_M: f64 = 804.672; // 2640 ft

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max),
        ]])
    }

    fn disc_at(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![disc(Point::new(x, y), RADIUS_M, 64)])
    }

    fn empty() -> MultiPolygon<f64> {
        MultiPolygon::new(Vec::new())
    }

    fn district(id: &str, class_code: &str, geometry: MultiPolygon<f64>) -> ZoningDistrict {
        ZoningDistrict {
            id: id.to_string(),
            class_code: class_code.to_string(),
            geometry,
        }
    }

    fn zone_area(zones: &[Zone; 3], category: ZoneCategory) -> f64 {
        zones
            .iter()
            .find(|zone| zone.category == category)
            .unwrap()
            .geometry
            .unsigned_area()
    }

    #[test]
    fn rail_disc_and_disjoint_downtown_in_mile_square() {
        let inputs = ZoneInputs {
            rail_buffer: disc_at(MILE_M / 2.0, MILE_M / 2.0),
            commuter_buffer: empty(),
            corridors: vec![],
            districts: vec![district("d1", "DX-16", square(0.0, 150.0))],
            boundary: square(0.0, MILE_M),
        };
        let zones = compute_zones(&inputs, &EngineConfig::default()).unwrap();

        let disc_area = PI * RADIUS_M * RADIUS_M;
        let no_parking = zone_area(&zones, ZoneCategory::NoParkingRequired);
        assert!((no_parking - disc_area).abs() / disc_area < 0.01);
        assert_eq!(zone_area(&zones, ZoneCategory::AdminAdjustmentTransit), 0.0);
        let downtown = zone_area(&zones, ZoneCategory::AdminAdjustmentDowntown);
        assert!((downtown - 150.0 * 150.0).abs() < 1.0);
    }

    #[test]
    fn isolated_commuter_station_gets_full_disc() {
        let inputs = ZoneInputs {
            rail_buffer: empty(),
            commuter_buffer: disc_at(2500.0, 2500.0),
            corridors: vec![],
            districts: vec![],
            boundary: square(0.0, 5000.0),
        };
        let zones = compute_zones(&inputs, &EngineConfig::default()).unwrap();

        let disc_area = PI * RADIUS_M * RADIUS_M;
        let transit = zone_area(&zones, ZoneCategory::AdminAdjustmentTransit);
        assert!((transit - disc_area).abs() / disc_area < 0.01);
        assert_eq!(zone_area(&zones, ZoneCategory::NoParkingRequired), 0.0);
    }

    #[test]
    fn fully_overlapped_commuter_buffer_vanishes() {
        let inputs = ZoneInputs {
            rail_buffer: disc_at(2500.0, 2500.0),
            commuter_buffer: disc_at(2500.0, 2500.0),
            corridors: vec![],
            districts: vec![],
            boundary: square(0.0, 5000.0),
        };
        let zones = compute_zones(&inputs, &EngineConfig::default()).unwrap();
        assert_eq!(zone_area(&zones, ZoneCategory::AdminAdjustmentTransit), 0.0);
    }

    #[test]
    fn corridor_counts_as_primary_coverage() {
        // commuter disc entirely inside the corridor rectangle
        let inputs = ZoneInputs {
            rail_buffer: empty(),
            commuter_buffer: disc_at(2500.0, 2500.0),
            corridors: vec![square(1000.0, 4000.0)],
            districts: vec![],
            boundary: square(0.0, 5000.0),
        };
        let zones = compute_zones(&inputs, &EngineConfig::default()).unwrap();
        assert_eq!(zone_area(&zones, ZoneCategory::AdminAdjustmentTransit), 0.0);
        let no_parking = zone_area(&zones, ZoneCategory::NoParkingRequired);
        assert!((no_parking - 3000.0 * 3000.0).abs() < 1.0);
    }

    #[test]
    fn non_downtown_districts_are_ignored() {
        let inputs = ZoneInputs {
            rail_buffer: disc_at(2500.0, 2500.0),
            commuter_buffer: empty(),
            corridors: vec![],
            districts: vec![
                district("res", "RS-3", square(0.0, 400.0)),
                district("biz", "B3-2", square(4000.0, 4400.0)),
            ],
            boundary: square(0.0, 5000.0),
        };
        let zones = compute_zones(&inputs, &EngineConfig::default()).unwrap();
        assert_eq!(zone_area(&zones, ZoneCategory::AdminAdjustmentDowntown), 0.0);
    }

    #[test]
    fn zones_partition_even_when_everything_overlaps() {
        // rail disc hangs over the boundary corner, commuter disc half-overlaps
        // it, a corridor crosses both, downtown district sits on the rail disc
        let inputs = ZoneInputs {
            rail_buffer: disc_at(400.0, 400.0),
            commuter_buffer: disc_at(1000.0, 400.0),
            corridors: vec![square(0.0, 700.0)],
            districts: vec![district("loop", "DC-12", square(300.0, 600.0))],
            boundary: square(0.0, 3000.0),
        };
        let config = EngineConfig::default();
        let zones = compute_zones(&inputs, &config).unwrap();

        for (first, second) in zones.iter().tuple_combinations() {
            let overlap = first.geometry.intersection(&second.geometry);
            assert!(
                overlap.unsigned_area() <= config.sliver_tolerance_sq_m,
                "{} and {} overlap",
                first.category,
                second.category
            );
        }
        for zone in &zones {
            let overflow = zone.geometry.difference(&inputs.boundary);
            assert!(overflow.unsigned_area() <= config.sliver_tolerance_sq_m);
        }
        let total: f64 = zones
            .iter()
            .map(|zone| zone.geometry.unsigned_area())
            .sum();
        assert!(total <= inputs.boundary.unsigned_area() + config.sliver_tolerance_sq_m);
    }

    #[test]
    fn identical_inputs_give_identical_zones() {
        let build = || ZoneInputs {
            rail_buffer: disc_at(1200.0, 1500.0),
            commuter_buffer: disc_at(2200.0, 1500.0),
            corridors: vec![square(500.0, 900.0)],
            districts: vec![district("d", "DX-5", square(1000.0, 1400.0))],
            boundary: square(0.0, 3000.0),
        };
        let first = compute_zones(&build(), &EngineConfig::default()).unwrap();
        let second = compute_zones(&build(), &EngineConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn overlapping_zones_are_rejected_with_the_pair() {
        let overlapping = [
            Zone {
                category: ZoneCategory::NoParkingRequired,
                geometry: square(0.0, 1000.0),
                area_sq_mi: 0.0,
            },
            Zone {
                category: ZoneCategory::AdminAdjustmentTransit,
                geometry: square(500.0, 1500.0),
                area_sq_mi: 0.0,
            },
            Zone {
                category: ZoneCategory::AdminAdjustmentDowntown,
                geometry: empty(),
                area_sq_mi: 0.0,
            },
        ];
        let err = check_zone_consistency(&overlapping, &square(0.0, 2000.0), 0.5).unwrap_err();
        match err {
            ZoneError::ZoneOverlap {
                first,
                second,
                overlap_sq_m,
                ..
            } => {
                assert_eq!(first, ZoneCategory::NoParkingRequired);
                assert_eq!(second, ZoneCategory::AdminAdjustmentTransit);
                assert!((overlap_sq_m - 250_000.0).abs() < 1.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zone_escaping_the_boundary_is_rejected() {
        let zones = [
            Zone {
                category: ZoneCategory::NoParkingRequired,
                geometry: square(0.0, 1500.0),
                area_sq_mi: 0.0,
            },
            Zone {
                category: ZoneCategory::AdminAdjustmentTransit,
                geometry: empty(),
                area_sq_mi: 0.0,
            },
            Zone {
                category: ZoneCategory::AdminAdjustmentDowntown,
                geometry: empty(),
                area_sq_mi: 0.0,
            },
        ];
        let err = check_zone_consistency(&zones, &square(0.0, 1000.0), 0.5).unwrap_err();
        assert!(matches!(
            err,
            ZoneError::ZoneOutsideBoundary {
                category: ZoneCategory::NoParkingRequired,
                ..
            }
        ));
    }
}
