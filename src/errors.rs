// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::models::{DatasetId, ZoneCategory};
use geo::MultiPolygon;
use thiserror::Error;

/// Terminal errors of the zone engine. Fetch failures may be retried inside
/// the source implementations before surfacing here; everything else aborts
/// the run. The engine never hands a partial zone set to a consumer.
#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("dataset {dataset} unavailable: {reason}")]
    SourceUnavailable { dataset: DatasetId, reason: String },

    #[error("unrepairable geometry in feature '{feature}': {reason}")]
    Geometry { feature: String, reason: String },

    #[error("projection failure: {reason}")]
    Projection { reason: String },

    #[error("zones {first} and {second} overlap by {overlap_sq_m:.3} sq m")]
    ZoneOverlap {
        first: ZoneCategory,
        second: ZoneCategory,
        overlap_sq_m: f64,
        /// the offending intersection, projected CRS
        overlap: MultiPolygon<f64>,
    },

    #[error("zone {category} extends {overflow_sq_m:.3} sq m outside the city boundary")]
    ZoneOutsideBoundary {
        category: ZoneCategory,
        overflow_sq_m: f64,
        /// the part that escaped the boundary, projected CRS
        overflow: MultiPolygon<f64>,
    },

    #[error("zone consumer failed: {reason}")]
    Consumer { reason: String },
}
