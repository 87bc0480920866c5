//! Geographic bounding boxes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DistillError;

/// Smallest accepted span on either axis, degrees.
pub const MIN_SPAN_DEG: f64 = 0.01;

/// Meters per degree of latitude (mean).
pub const METERS_PER_DEG_LAT: f64 = 110_574.0;
/// Meters per degree of longitude at the equator.
pub const METERS_PER_DEG_LON: f64 = 111_320.0;

/// `min_lon, min_lat, max_lon, max_lat` in WGS84 degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    /// Swap inverted corners, then validate range and size.
    pub fn normalized(&self) -> Result<Self, DistillError> {
        let values = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DistillError::InvalidBbox(format!("non-finite coordinate in {}", self)));
        }

        let b = BoundingBox {
            min_lon: self.min_lon.min(self.max_lon),
            max_lon: self.min_lon.max(self.max_lon),
            min_lat: self.min_lat.min(self.max_lat),
            max_lat: self.min_lat.max(self.max_lat),
        };

        if b.min_lon < -180.0 || b.max_lon > 180.0 {
            return Err(DistillError::InvalidBbox(format!("longitude outside [-180, 180] in {}", b)));
        }
        if b.min_lat < -90.0 || b.max_lat > 90.0 {
            return Err(DistillError::InvalidBbox(format!("latitude outside [-90, 90] in {}", b)));
        }
        if b.lon_span() < MIN_SPAN_DEG || b.lat_span() < MIN_SPAN_DEG {
            return Err(DistillError::InvalidBbox(format!(
                "box {} is too small (each span must be at least {} degrees)",
                b, MIN_SPAN_DEG
            )));
        }
        Ok(b)
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn mid_lat(&self) -> f64 {
        (self.min_lat + self.max_lat) / 2.0
    }

    /// Approximate (width, height) in meters, equirectangular at the mid-latitude.
    pub fn extent_meters(&self) -> (f64, f64) {
        let width = self.lon_span() * METERS_PER_DEG_LON * self.mid_lat().to_radians().cos();
        let height = self.lat_span() * METERS_PER_DEG_LAT;
        (width, height)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

/// Parses `minLon,minLat,maxLon,maxLat`.
impl FromStr for BoundingBox {
    type Err = DistillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(DistillError::InvalidBbox(format!(
                "expected minLon,minLat,maxLon,maxLat, got {:?}",
                s
            )));
        }
        let mut v = [0.0f64; 4];
        for (slot, part) in v.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| DistillError::InvalidBbox(format!("not a number: {:?}", part)))?;
        }
        Ok(BoundingBox::new(v[0], v[1], v[2], v[3]))
    }
}
