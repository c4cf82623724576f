use geohash::{encode, neighbors, Coord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Geohash precision used to bucket merge decisions. Cells at this precision
/// are ~4.9 km x 4.9 km, far wider than any sane merge radius, so a candidate
/// issue always lies in the report's cell or one of its eight neighbors.
const MERGE_CELL_PRECISION: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(f64),
}

pub fn validate_latitude(latitude: f64) -> Result<f64, GeoError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(GeoError::LatitudeOutOfRange(latitude));
    }
    Ok(latitude)
}

pub fn validate_longitude(longitude: f64) -> Result<f64, GeoError> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(GeoError::LongitudeOutOfRange(longitude));
    }
    Ok(longitude)
}

/// A validated WGS84 point. Every geometry this service writes goes through
/// this type, and SQL always binds longitude before latitude to match
/// `ST_MakePoint(lon, lat)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        Ok(Self {
            latitude: validate_latitude(latitude)?,
            longitude: validate_longitude(longitude)?,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance in meters (haversine). The relational store
    /// computes distances on the geography type; this is for in-memory
    /// callers that have no database at hand.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METERS * c
    }

    /// The geohash cell containing this point plus its eight neighbors,
    /// sorted. Lock acquisition in sorted order keeps concurrent merge
    /// transactions deadlock-free.
    pub fn merge_cells(&self) -> Vec<String> {
        let coord = Coord {
            x: self.longitude,
            y: self.latitude,
        };
        let Ok(cell) = encode(coord, MERGE_CELL_PRECISION) else {
            // encode only fails on out-of-range coords, which new() rejects
            return vec![format!("{:.3}:{:.3}", self.longitude, self.latitude)];
        };

        let mut cells = vec![cell.clone()];
        if let Ok(n) = neighbors(&cell) {
            cells.extend([n.n, n.ne, n.e, n.se, n.s, n.sw, n.w, n.nw]);
        }
        cells.sort();
        cells
    }
}
