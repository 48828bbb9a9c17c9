// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::errors::ZoneError;
use crate::models::{CoverageStats, DatasetId, RawFeature, Zone};
use crate::pipeline::{DataSource, ZoneConsumer};
use ahash::{AHashMap, AHashSet};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub enum SourceLocation {
    Path(PathBuf),
    Url(String),
}

impl SourceLocation {
    /// Anything with a scheme goes over HTTP, everything else is a file path.
    pub fn parse(raw: &str) -> SourceLocation {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Url(raw.to_string())
        } else {
            SourceLocation::Path(PathBuf::from(raw))
        }
    }
}

/// GeoJSON-backed `DataSource`. Each dataset maps to a local file or an HTTP
/// endpoint; HTTP fetches get a bounded number of attempts before the error
/// becomes terminal, so a flaky portal does not abort a run on its own.
pub struct GeoJsonSource {
    locations: AHashMap<DatasetId, SourceLocation>,
    /// feature property carrying the zoning class code on district datasets
    class_property: String,
    client: reqwest::Client,
    attempts: u32,
    request_timeout: Duration,
}

impl GeoJsonSource {
    pub fn new(class_property: &str, attempts: u32, request_timeout_secs: u64) -> GeoJsonSource {
        GeoJsonSource {
            locations: AHashMap::new(),
            class_property: class_property.to_string(),
            client: reqwest::Client::new(),
            attempts: attempts.max(1),
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    pub fn with_location(mut self, dataset: DatasetId, location: SourceLocation) -> GeoJsonSource {
        self.locations.insert(dataset, location);
        self
    }

    async fn fetch_text(&self, dataset: DatasetId) -> Result<String, ZoneError> {
        let location = self.locations.get(&dataset).ok_or_else(|| {
            ZoneError::SourceUnavailable {
                dataset,
                reason: "no location configured".to_string(),
            }
        })?;

        match location {
            SourceLocation::Path(path) => {
                std::fs::read_to_string(path).map_err(|e| ZoneError::SourceUnavailable {
                    dataset,
                    reason: format!("read {}: {e}", path.display()),
                })
            }
            SourceLocation::Url(url) => {
                let mut last_error = String::new();
                for attempt in 1..=self.attempts {
                    let response = self
                        .client
                        .get(url)
                        .timeout(self.request_timeout)
                        .send()
                        .await
                        .and_then(|response| response.error_for_status());
                    match response {
                        Ok(response) => match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => last_error = e.to_string(),
                        },
                        Err(e) => last_error = e.to_string(),
                    }
                    warn!(
                        "{} fetch attempt {}/{} failed: {}",
                        dataset, attempt, self.attempts, last_error
                    );
                    if attempt < self.attempts {
                        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                    }
                }
                Err(ZoneError::SourceUnavailable {
                    dataset,
                    reason: format!("gave up after {} attempts: {last_error}", self.attempts),
                })
            }
        }
    }
}

impl DataSource for GeoJsonSource {
    async fn fetch(&self, dataset: DatasetId) -> Result<Vec<RawFeature>, ZoneError> {
        let body = self.fetch_text(dataset).await?;
        parse_feature_collection(dataset, &body, &self.class_property)
    }
}

/// Parse a FeatureCollection into raw features, deduplicated by feature id.
/// A feature without geometry comes back as an explicitly empty MultiPolygon
/// rather than disappearing here; the validator owns rejection.
pub fn parse_feature_collection(
    dataset: DatasetId,
    raw: &str,
    class_property: &str,
) -> Result<Vec<RawFeature>, ZoneError> {
    let geojson: GeoJson = raw.parse().map_err(|e| ZoneError::SourceUnavailable {
        dataset,
        reason: format!("invalid GeoJSON: {e}"),
    })?;
    let collection =
        FeatureCollection::try_from(geojson).map_err(|e| ZoneError::SourceUnavailable {
            dataset,
            reason: format!("not a FeatureCollection: {e}"),
        })?;

    let mut seen_ids: AHashSet<String> = AHashSet::new();
    let mut features = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let id = feature_id(&feature, dataset, index);
        if !seen_ids.insert(id.clone()) {
            warn!("{}: duplicate feature id '{}', skipping", dataset, id);
            continue;
        }

        let geometry = match feature.geometry {
            Some(geometry) => geo::Geometry::<f64>::try_from(geometry.value).map_err(|e| {
                ZoneError::Geometry {
                    feature: id.clone(),
                    reason: format!("unconvertible geometry: {e}"),
                }
            })?,
            None => geo::Geometry::MultiPolygon(geo::MultiPolygon::new(Vec::new())),
        };

        let class_code = feature
            .properties
            .as_ref()
            .and_then(|properties| properties.get(class_property))
            .and_then(|value| value.as_str())
            .map(str::to_string);

        features.push(RawFeature {
            id,
            class_code,
            geometry,
        });
    }

    Ok(features)
}

fn feature_id(feature: &Feature, dataset: DatasetId, index: usize) -> String {
    match &feature.id {
        Some(geojson::feature::Id::String(id)) => id.clone(),
        Some(geojson::feature::Id::Number(id)) => id.to_string(),
        None => feature
            .properties
            .as_ref()
            .and_then(|properties| properties.get("id"))
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{dataset}-{index}")),
    }
}

/// Writes the three zones as a FeatureCollection in the geographic CRS, with
/// the rounded stats on each feature.
pub struct GeoJsonZoneWriter {
    path: PathBuf,
}

impl GeoJsonZoneWriter {
    pub fn new(path: impl Into<PathBuf>) -> GeoJsonZoneWriter {
        GeoJsonZoneWriter { path: path.into() }
    }
}

impl ZoneConsumer for GeoJsonZoneWriter {
    fn accept(&mut self, zones: &[Zone; 3], stats: &CoverageStats) -> Result<(), ZoneError> {
        let report = stats.rounded();

        let features = zones
            .iter()
            .zip(report.per_zone.iter())
            .map(|(zone, stat)| {
                let mut properties = geojson::JsonObject::new();
                properties.insert(
                    "category".to_string(),
                    serde_json::Value::from(zone.category.as_str()),
                );
                properties.insert(
                    "label".to_string(),
                    serde_json::Value::from(zone.category.label()),
                );
                properties.insert(
                    "area_sq_mi".to_string(),
                    serde_json::Value::from(stat.area_sq_mi),
                );
                properties.insert(
                    "share_pct".to_string(),
                    serde_json::Value::from(stat.share_pct),
                );
                Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(
                        &zone.geometry,
                    ))),
                    id: Some(geojson::feature::Id::String(
                        zone.category.as_str().to_string(),
                    )),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let mut foreign_members = geojson::JsonObject::new();
        foreign_members.insert(
            "city_area_sq_mi".to_string(),
            serde_json::Value::from(report.city_area_sq_mi),
        );

        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        };

        std::fs::write(&self.path, GeoJson::from(collection).to_string()).map_err(|e| {
            ZoneError::Consumer {
                reason: format!("write {}: {e}", self.path.display()),
            }
        })?;
        info!("zones written to {}", self.path.display());
        Ok(())
    }
}
