// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use geo::{Geometry, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Agency {
    CityRail,
    CommuterRail,
}

impl Agency {
    pub fn dataset(&self) -> DatasetId {
        match self {
            Agency::CityRail => DatasetId::RailStations,
            Agency::CommuterRail => DatasetId::CommuterStations,
        }
    }
}

impl fmt::Display for Agency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Agency::CityRail => "city-rail",
            Agency::CommuterRail => "commuter-rail",
        })
    }
}

/// One canonical station per physical location, in the geographic CRS.
#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: Option<String>,
    pub agency: Agency,
    pub location: Point<f64>,
}

/// How a feed collapsed its stop list down to physical stations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchySource {
    /// parent_station / location_type metadata was present and used
    ExplicitHierarchy,
    /// no hierarchy metadata; kept only stops serviced by rail-class routes
    RouteInference,
}

impl fmt::Display for HierarchySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HierarchySource::ExplicitHierarchy => "explicit-hierarchy",
            HierarchySource::RouteInference => "route-inference",
        })
    }
}

#[derive(Clone, Debug)]
pub struct StationSet {
    pub agency: Agency,
    pub stations: Vec<Station>,
    pub hierarchy: HierarchySource,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetId {
    RailStations,
    CommuterStations,
    BusCorridors,
    ZoningDistricts,
    CityBoundary,
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatasetId::RailStations => "rail-stations",
            DatasetId::CommuterStations => "commuter-stations",
            DatasetId::BusCorridors => "bus-corridors",
            DatasetId::ZoningDistricts => "zoning-districts",
            DatasetId::CityBoundary => "city-boundary",
        })
    }
}

/// A single feature as handed over by a `DataSource`, before validation.
#[derive(Clone, Debug)]
pub struct RawFeature {
    pub id: String,
    /// zoning class code, present on district datasets only
    pub class_code: Option<String>,
    pub geometry: Geometry<f64>,
}

#[derive(Clone, Debug)]
pub struct ZoningDistrict {
    pub id: String,
    pub class_code: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneCategory {
    NoParkingRequired,
    AdminAdjustmentTransit,
    AdminAdjustmentDowntown,
}

impl ZoneCategory {
    pub const ALL: [ZoneCategory; 3] = [
        ZoneCategory::NoParkingRequired,
        ZoneCategory::AdminAdjustmentTransit,
        ZoneCategory::AdminAdjustmentDowntown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneCategory::NoParkingRequired => "no_parking_required",
            ZoneCategory::AdminAdjustmentTransit => "admin_adjustment_transit",
            ZoneCategory::AdminAdjustmentDowntown => "admin_adjustment_downtown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ZoneCategory::NoParkingRequired => "Parking mandate eliminated",
            ZoneCategory::AdminAdjustmentTransit => {
                "Administrative adjustment required (commuter rail)"
            }
            ZoneCategory::AdminAdjustmentDowntown => {
                "Administrative adjustment required (downtown)"
            }
        }
    }
}

impl fmt::Display for ZoneCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three regulatory classifications. Produced only by the zone
/// algebra engine; the geometry is projected there and converted to the
/// geographic CRS by the pipeline before leaving the core. The area is
/// always the projected-CRS planar measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    pub category: ZoneCategory,
    pub geometry: MultiPolygon<f64>,
    pub area_sq_mi: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneStat {
    pub category: ZoneCategory,
    pub area_sq_mi: f64,
    pub share_pct: f64,
}

/// Full-precision coverage figures. Rounding happens only in [`CoverageStats::rounded`]
/// (implemented in `coverage_stats`), at the presentation boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub per_zone: [ZoneStat; 3],
    pub city_area_sq_mi: f64,
}

/// Presentation form of [`CoverageStats`]: one decimal place everywhere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub per_zone: [ZoneStat; 3],
    pub city_area_sq_mi: f64,
}
