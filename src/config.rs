// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use serde::{Deserialize, Serialize};

/// WGS 84 lon/lat, the interchange CRS of every source dataset.
pub const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// NAD83 / Illinois East in metres. All buffering and area measurement
/// happens in this CRS; configured distances are in feet and converted once.
pub const ILLINOIS_EAST_METRES: &str = "+proj=tmerc +lat_0=36.66666666666666 +lon_0=-88.33333333333333 +k=0.999975 +x_0=300000 +y_0=0 +ellps=GRS80 +units=m +no_defs +type=crs";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TSL radius around city rapid-transit stations, feet
    pub rail_buffer_feet: f64,
    /// TSL radius around commuter rail stations, feet
    pub commuter_buffer_feet: f64,
    /// zoning class codes with this prefix form the downtown carve-out
    pub downtown_class_prefix: String,
    /// PROJ.4 definition of the geographic CRS
    pub geographic_crs: String,
    /// PROJ.4 definition of the projected CRS, metre units
    pub projected_crs: String,
    /// segments per station disc
    pub buffer_segments: usize,
    /// areas below this are treated as zero (slivers, overlap checks), sq m
    pub sliver_tolerance_sq_m: f64,
    pub fetch_timeout_secs: u64,
    /// attempts per fetch inside the HTTP source before giving up
    pub fetch_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rail_buffer_feet: 2640.0,
            commuter_buffer_feet: 2640.0,
            downtown_class_prefix: "D".to_string(),
            geographic_crs: WGS84_LONGLAT.to_string(),
            projected_crs: ILLINOIS_EAST_METRES.to_string(),
            buffer_segments: 64,
            sliver_tolerance_sq_m: 0.5,
            fetch_timeout_secs: 30,
            fetch_attempts: 3,
        }
    }
}
