// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::errors::ZoneError;
use geo::{Coord, MapCoords, MultiPolygon, Point};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Converts geometries between the geographic interchange CRS and the local
/// projected CRS. Distance-sensitive work (buffering, area) only ever happens
/// on the projected side; proj4rs wants radians at the geographic boundary.
pub struct Projector {
    geographic: Proj,
    projected: Proj,
}

impl Projector {
    pub fn new(geographic_def: &str, projected_def: &str) -> Result<Projector, ZoneError> {
        let geographic = Proj::from_proj_string(geographic_def).map_err(|e| {
            ZoneError::Projection {
                reason: format!("unparseable geographic CRS '{geographic_def}': {e}"),
            }
        })?;
        let projected = Proj::from_proj_string(projected_def).map_err(|e| {
            ZoneError::Projection {
                reason: format!("unparseable projected CRS '{projected_def}': {e}"),
            }
        })?;
        Ok(Projector {
            geographic,
            projected,
        })
    }

    fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ZoneError> {
        if !coord.x.is_finite()
            || !coord.y.is_finite()
            || coord.x.abs() > 180.0
            || coord.y.abs() > 90.0
        {
            return Err(ZoneError::Projection {
                reason: format!(
                    "coordinate ({}, {}) outside the geographic domain",
                    coord.x, coord.y
                ),
            });
        }

        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.projected, &mut point).map_err(|e| {
            ZoneError::Projection {
                reason: format!("transform failed at ({}, {}): {e}", coord.x, coord.y),
            }
        })?;
        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    }

    fn inverse(&self, coord: Coord<f64>) -> Result<Coord<f64>, ZoneError> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(ZoneError::Projection {
                reason: format!("non-finite projected coordinate ({}, {})", coord.x, coord.y),
            });
        }

        let mut point = (coord.x, coord.y, 0.0);
        transform(&self.projected, &self.geographic, &mut point).map_err(|e| {
            ZoneError::Projection {
                reason: format!(
                    "inverse transform failed at ({}, {}): {e}",
                    coord.x, coord.y
                ),
            }
        })?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    }

    pub fn to_projected(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, ZoneError> {
        geometry.try_map_coords(|coord| self.forward(coord))
    }

    pub fn to_geographic(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, ZoneError> {
        geometry.try_map_coords(|coord| self.inverse(coord))
    }

    pub fn point_to_projected(&self, point: &Point<f64>) -> Result<Point<f64>, ZoneError> {
        point.try_map_coords(|coord| self.forward(coord))
    }
}
