// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::buffering::buffer_stations;
use crate::config::EngineConfig;
use crate::coverage_stats::compute_stats;
use crate::errors::ZoneError;
use crate::models::{
    Agency, CoverageStats, DatasetId, HierarchySource, RawFeature, StationSet, Zone,
    ZoningDistrict,
};
use crate::projection::Projector;
use crate::validation::{CleanFeature, validate_features};
use crate::zone_algebra::{ZoneInputs, compute_zones};
use chrono::{DateTime, Utc};
use geo::{Area, BooleanOps, MultiPolygon};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::info;
use uuid::Uuid;

/// Hands over raw polygon datasets (corridors, districts, boundary).
/// Implementations retry transient failures themselves; whatever error comes
/// back here is terminal for the run.
#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn fetch(&self, dataset: DatasetId) -> Result<Vec<RawFeature>, ZoneError>;
}

/// Hands over one canonical station per physical location for an agency.
#[allow(async_fn_in_trait)]
pub trait StationFeed {
    async fn stations(&self, agency: Agency) -> Result<StationSet, ZoneError>;
}

/// The only way results leave the engine. Gets geographic-CRS zones and the
/// full-precision stats; presentation is the consumer's problem.
pub trait ZoneConsumer {
    fn accept(&mut self, zones: &[Zone; 3], stats: &CoverageStats) -> Result<(), ZoneError>;
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// geographic CRS
    pub zones: [Zone; 3],
    pub stats: CoverageStats,
    pub rail_hierarchy: HierarchySource,
    pub commuter_hierarchy: HierarchySource,
}

pub struct ZonePipeline {
    config: EngineConfig,
}

impl ZonePipeline {
    pub fn new(config: EngineConfig) -> ZonePipeline {
        ZonePipeline { config }
    }

    /// Run the whole derivation: fetch and validate the five independent
    /// inputs concurrently, buffer both station classes, do the zone algebra,
    /// measure, then hand the result to the consumer. Fails fast with the
    /// first error; the consumer never sees a partial result.
    pub async fn run<S, F, C>(
        &self,
        source: &S,
        feed: &F,
        consumer: &mut C,
    ) -> Result<PipelineOutput, ZoneError>
    where
        S: DataSource,
        F: StationFeed,
        C: ZoneConsumer,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let begun = Instant::now();
        info!("zone run {} starting", run_id);

        let projector = Arc::new(Projector::new(
            &self.config.geographic_crs,
            &self.config.projected_crs,
        )?);
        let budget = Duration::from_secs(self.config.fetch_timeout_secs);

        // fetched features are still in degrees; the metric sliver tolerance
        // only applies once the algebra runs in the projected CRS, so repair
        // here drops zero-area rings only
        let (rail_set, commuter_set, corridor_features, district_features, boundary_features) =
            tokio::try_join!(
                fetch_stations(feed, Agency::CityRail, budget),
                fetch_stations(feed, Agency::CommuterRail, budget),
                fetch_validated(source, DatasetId::BusCorridors, budget),
                fetch_validated(source, DatasetId::ZoningDistricts, budget),
                fetch_validated(source, DatasetId::CityBoundary, budget),
            )?;
        info!(
            "inputs fetched in {:?}: {} rail stations ({}), {} commuter stations ({}), {} corridors, {} districts",
            begun.elapsed(),
            rail_set.stations.len(),
            rail_set.hierarchy,
            commuter_set.stations.len(),
            commuter_set.hierarchy,
            corridor_features.len(),
            district_features.len()
        );

        let boundary = boundary_features
            .iter()
            .fold(MultiPolygon::new(Vec::new()), |acc, feature| {
                acc.union(&feature.geometry)
            });
        if boundary.unsigned_area() == 0.0 {
            return Err(ZoneError::SourceUnavailable {
                dataset: DatasetId::CityBoundary,
                reason: "boundary dataset is empty".to_string(),
            });
        }
        let boundary = projector.to_projected(&boundary)?;

        let corridors = corridor_features
            .iter()
            .map(|feature| projector.to_projected(&feature.geometry))
            .collect::<Result<Vec<_>, _>>()?;

        let districts = district_features
            .iter()
            .filter_map(|feature| {
                feature.class_code.clone().map(|class_code| {
                    projector.to_projected(&feature.geometry).map(|geometry| {
                        ZoningDistrict {
                            id: feature.id.clone(),
                            class_code,
                            geometry,
                        }
                    })
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // the two buffer builds are independent, run them side by side
        let rail_buffer_task = {
            let stations = rail_set.stations.clone();
            let projector = projector.clone();
            let radius = self.config.rail_buffer_feet;
            let segments = self.config.buffer_segments;
            tokio::task::spawn_blocking(move || {
                buffer_stations(&stations, radius, segments, &projector)
            })
        };
        let commuter_buffer_task = {
            let stations = commuter_set.stations.clone();
            let projector = projector.clone();
            let radius = self.config.commuter_buffer_feet;
            let segments = self.config.buffer_segments;
            tokio::task::spawn_blocking(move || {
                buffer_stations(&stations, radius, segments, &projector)
            })
        };
        let (rail_join, commuter_join) = tokio::join!(rail_buffer_task, commuter_buffer_task);
        let rail_buffer = rail_join.map_err(|e| ZoneError::Geometry {
            feature: "rail-buffer".to_string(),
            reason: format!("buffer task failed: {e}"),
        })??;
        let commuter_buffer = commuter_join.map_err(|e| ZoneError::Geometry {
            feature: "commuter-buffer".to_string(),
            reason: format!("buffer task failed: {e}"),
        })??;

        let inputs = ZoneInputs {
            rail_buffer,
            commuter_buffer,
            corridors,
            districts,
            boundary,
        };
        let zones_projected = compute_zones(&inputs, &self.config)?;
        let stats = compute_stats(&zones_projected, &inputs.boundary);

        let to_geographic = |zone: &Zone| -> Result<Zone, ZoneError> {
            Ok(Zone {
                category: zone.category,
                geometry: projector.to_geographic(&zone.geometry)?,
                area_sq_mi: zone.area_sq_mi,
            })
        };
        let zones = [
            to_geographic(&zones_projected[0])?,
            to_geographic(&zones_projected[1])?,
            to_geographic(&zones_projected[2])?,
        ];

        consumer.accept(&zones, &stats)?;

        let elapsed = begun.elapsed();
        info!("zone run {} finished in {:?}", run_id, elapsed);

        Ok(PipelineOutput {
            run_id,
            started_at,
            elapsed,
            zones,
            stats,
            rail_hierarchy: rail_set.hierarchy,
            commuter_hierarchy: commuter_set.hierarchy,
        })
    }
}

async fn fetch_stations<F: StationFeed>(
    feed: &F,
    agency: Agency,
    budget: Duration,
) -> Result<StationSet, ZoneError> {
    match timeout(budget, feed.stations(agency)).await {
        Ok(result) => result,
        Err(_) => Err(ZoneError::SourceUnavailable {
            dataset: agency.dataset(),
            reason: format!("station fetch timed out after {}s", budget.as_secs()),
        }),
    }
}

async fn fetch_validated<S: DataSource>(
    source: &S,
    dataset: DatasetId,
    budget: Duration,
) -> Result<Vec<CleanFeature>, ZoneError> {
    let features = match timeout(budget, source.fetch(dataset)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ZoneError::SourceUnavailable {
                dataset,
                reason: format!("fetch timed out after {}s", budget.as_secs()),
            });
        }
    };

    let outcome = validate_features(features, 0.0);
    if let Some(first_rejection) = outcome.rejected.into_iter().next() {
        return Err(first_rejection);
    }
    Ok(outcome.accepted)
}
