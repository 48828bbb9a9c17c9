// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::SQ_METRES_PER_SQ_MILE;
use crate::models::{CoverageReport, CoverageStats, Zone, ZoneStat};
use geo::{Area, MultiPolygon};

/// Planar area of a projected geometry, in square miles.
pub fn area_sq_miles(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area() / SQ_METRES_PER_SQ_MILE
}

/// Measure the three zones against the jurisdiction. Both the zones and the
/// boundary must still be in the projected CRS; degree-squared areas are
/// meaningless. Values stay full precision here so nothing upstream ever
/// depends on rounding.
pub fn compute_stats(zones: &[Zone; 3], boundary: &MultiPolygon<f64>) -> CoverageStats {
    let city_area_sq_mi = area_sq_miles(boundary);

    let per_zone = zones.each_ref().map(|zone| ZoneStat {
        category: zone.category,
        area_sq_mi: zone.area_sq_mi,
        share_pct: if city_area_sq_mi > 0.0 {
            100.0 * zone.area_sq_mi / city_area_sq_mi
        } else {
            0.0
        },
    });

    CoverageStats {
        per_zone,
        city_area_sq_mi,
    }
}

impl CoverageStats {
    /// One decimal place, applied only here at the presentation boundary.
    pub fn rounded(&self) -> CoverageReport {
        CoverageReport {
            per_zone: self.per_zone.map(|stat| ZoneStat {
                category: stat.category,
                area_sq_mi: round_tenth(stat.area_sq_mi),
                share_pct: round_tenth(stat.share_pct),
            }),
            city_area_sq_mi: round_tenth(self.city_area_sq_mi),
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
