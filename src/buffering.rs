// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::errors::ZoneError;
use crate::feet_to_metres;
use crate::models::Station;
use crate::projection::Projector;
use crate::validation::repair_multi_polygon;
use ahash::AHashSet;
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Point, Polygon};
use std::f64::consts::PI;

/// Expand a station set into its unioned TSL coverage, in the projected CRS.
///
/// Stations sharing an exact coordinate collapse to one disc. Pure with
/// respect to its inputs, so callers can re-run it with a different radius.
pub fn buffer_stations(
    stations: &[Station],
    radius_feet: f64,
    segments: usize,
    projector: &Projector,
) -> Result<MultiPolygon<f64>, ZoneError> {
    let segments = segments.max(8);
    // pad the circumradius so the ring circumscribes the true circle;
    // a point at exactly radius distance is then inside the ring
    let circumradius = feet_to_metres(radius_feet) / (PI / segments as f64).cos();

    let mut seen_coords: AHashSet<(u64, u64)> = AHashSet::new();
    let mut coverage = MultiPolygon::new(Vec::new());

    for station in stations {
        let key = (
            station.location.x().to_bits(),
            station.location.y().to_bits(),
        );
        if !seen_coords.insert(key) {
            continue;
        }

        let centre = projector.point_to_projected(&station.location)?;
        let station_disc = MultiPolygon::new(vec![disc(centre, circumradius, segments)]);
        coverage = coverage.union(&station_disc);
    }

    repair_multi_polygon(&coverage, 0.0).map_err(|reason| ZoneError::Geometry {
        feature: "station-buffer".to_string(),
        reason,
    })
}

pub(crate) fn disc(centre: Point<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let mut ring = Vec::with_capacity(segments + 1);
    for i in 0..segments {
        let angle = 2.0 * PI * i as f64 / segments as f64;
        ring.push(Coord {
            x: centre.x() + radius * angle.cos(),
            y: centre.y() + radius * angle.sin(),
        });
    }
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), vec![])
}
