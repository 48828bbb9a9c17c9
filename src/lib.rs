// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

pub mod buffering;
pub mod config;
pub mod coverage_stats;
pub mod errors;
pub mod geojson_io;
pub mod models;
pub mod pipeline;
pub mod projection;
pub mod station_hierarchy;
pub mod validation;
pub mod zone_algebra;

pub const WGS_84_SRID: u32 = 4326;
pub const ILLINOIS_EAST_SRID: u32 = 26971;

pub const METRES_PER_FOOT: f64 = 0.3048;
pub const SQ_METRES_PER_SQ_MILE: f64 = 2_589_988.110_336;

pub fn is_null_island(lon: f64, lat: f64) -> bool {
    lon == 0.0 && lat == 0.0
}

/// Both coordinates present, finite, and not the (0,0) junk marker.
pub fn usable_lon_lat(lon: Option<f64>, lat: Option<f64>) -> Option<(f64, f64)> {
    match (lon, lat) {
        (Some(lon), Some(lat))
            if lon.is_finite() && lat.is_finite() && !is_null_island(lon, lat) =>
        {
            Some((lon, lat))
        }
        _ => None,
    }
}

pub fn feet_to_metres(feet: f64) -> f64 {
    feet * METRES_PER_FOOT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_island_is_rejected() {
        assert!(is_null_island(0.0, 0.0));
        assert!(!is_null_island(-87.6298, 41.8781));
        assert_eq!(usable_lon_lat(Some(0.0), Some(0.0)), None);
        assert_eq!(usable_lon_lat(Some(f64::NAN), Some(41.0)), None);
        assert_eq!(usable_lon_lat(None, Some(41.0)), None);
        assert_eq!(
            usable_lon_lat(Some(-87.6298), Some(41.8781)),
            Some((-87.6298, 41.8781))
        );
    }

    #[test]
    fn half_mile_in_metres() {
        assert!((feet_to_metres(2640.0) - 804.672).abs() < 1e-9);
    }
}
