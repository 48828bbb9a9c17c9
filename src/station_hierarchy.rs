// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::errors::ZoneError;
use crate::models::{Agency, HierarchySource, Station, StationSet};
use crate::pipeline::StationFeed;
use crate::usable_lon_lat;
use ahash::{AHashMap, AHashSet};
use geo::Point;
use gtfs_structures::{Gtfs, LocationType, RouteType};
use tracing::{info, warn};

/// Station feed over static GTFS archives, one per agency.
///
/// A GTFS stop list usually carries several entries per physical station
/// (platforms, entrances, the parent record). The feed collapses those to one
/// canonical station per physical location before anything gets buffered,
/// preferring the explicit parent_station hierarchy and falling back to
/// keeping only stops serviced by rail-class routes when the feed has no
/// hierarchy metadata at all. The strategy used is recorded in the result.
#[derive(Default)]
pub struct GtfsStationFeed {
    feeds: AHashMap<Agency, Gtfs>,
}

impl GtfsStationFeed {
    pub fn new() -> GtfsStationFeed {
        GtfsStationFeed::default()
    }

    pub fn with_feed(mut self, agency: Agency, gtfs: Gtfs) -> GtfsStationFeed {
        self.feeds.insert(agency, gtfs);
        self
    }

    fn resolve(&self, agency: Agency) -> Result<StationSet, ZoneError> {
        let gtfs = self.feeds.get(&agency).ok_or_else(|| ZoneError::SourceUnavailable {
            dataset: agency.dataset(),
            reason: "no GTFS feed registered for this agency".to_string(),
        })?;

        let rail_served = rail_served_stop_ids(gtfs);
        let stops = gtfs
            .stops
            .values()
            .map(|stop| StopRecord {
                id: stop.id.clone(),
                name: stop.name.clone(),
                lon: stop.longitude,
                lat: stop.latitude,
                parent: stop.parent_station.clone(),
                is_station: stop.location_type == LocationType::StopArea,
            })
            .collect();

        let (stations, hierarchy) = resolve_stations(agency, stops, &rail_served);
        if stations.is_empty() {
            warn!("{} feed produced zero rail stations", agency);
        }
        info!(
            "{}: {} stations resolved via {}",
            agency,
            stations.len(),
            hierarchy
        );

        Ok(StationSet {
            agency,
            stations,
            hierarchy,
        })
    }
}

impl StationFeed for GtfsStationFeed {
    async fn stations(&self, agency: Agency) -> Result<StationSet, ZoneError> {
        self.resolve(agency)
    }
}

pub fn is_rail_class(route_type: &RouteType) -> bool {
    matches!(
        route_type,
        RouteType::Tramway | RouteType::Subway | RouteType::Rail
    )
}

/// Every stop id that appears in the stop_times of a rail-class trip.
fn rail_served_stop_ids(gtfs: &Gtfs) -> AHashSet<String> {
    let mut rail_served = AHashSet::new();
    for trip in gtfs.trips.values() {
        if let Ok(route) = gtfs.get_route(&trip.route_id) {
            if !is_rail_class(&route.route_type) {
                continue;
            }
            for stop_time in &trip.stop_times {
                rail_served.insert(stop_time.stop.id.clone());
            }
        }
    }
    rail_served
}

pub(crate) struct StopRecord {
    pub id: String,
    pub name: Option<String>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub parent: Option<String>,
    pub is_station: bool,
}

/// Collapse rail-served stops to canonical stations. Sorted by stop id first
/// so identical input always yields identical output regardless of map
/// iteration order.
pub(crate) fn resolve_stations(
    agency: Agency,
    mut stops: Vec<StopRecord>,
    rail_served: &AHashSet<String>,
) -> (Vec<Station>, HierarchySource) {
    stops.sort_by(|a, b| a.id.cmp(&b.id));

    let by_id: AHashMap<&str, &StopRecord> =
        stops.iter().map(|stop| (stop.id.as_str(), stop)).collect();
    let hierarchy = if stops
        .iter()
        .any(|stop| stop.is_station || stop.parent.is_some())
    {
        HierarchySource::ExplicitHierarchy
    } else {
        HierarchySource::RouteInference
    };

    let mut taken_ids: AHashSet<&str> = AHashSet::new();
    let mut taken_coords: AHashSet<(u64, u64)> = AHashSet::new();
    let mut stations = Vec::new();

    for stop in &stops {
        if !rail_served.contains(&stop.id) {
            continue;
        }

        let canonical = match hierarchy {
            HierarchySource::ExplicitHierarchy => stop
                .parent
                .as_deref()
                .and_then(|parent| by_id.get(parent).copied())
                .filter(|parent| usable_lon_lat(parent.lon, parent.lat).is_some())
                .unwrap_or(stop),
            HierarchySource::RouteInference => stop,
        };

        let Some((lon, lat)) = usable_lon_lat(canonical.lon, canonical.lat) else {
            warn!("stop {} has no usable coordinates, skipping", canonical.id);
            continue;
        };

        if !taken_ids.insert(canonical.id.as_str()) {
            continue;
        }
        if !taken_coords.insert((lon.to_bits(), lat.to_bits())) {
            continue;
        }

        stations.push(Station {
            id: canonical.id.clone(),
            name: canonical.name.clone(),
            agency,
            location: Point::new(lon, lat),
        });
    }

    (stations, hierarchy)
}
