//! Terrain calibration profile: a compact statistical fingerprint of a
//! real-world area.
//!
//! Profiles come from the distiller or are written by hand. Either way they
//! pass through [`Profile::normalize`] before use, which repairs ordering and
//! range violations instead of rejecting the file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Elevation percentiles must stay inside the signed 8-bit cell range.
pub const ELEVATION_MIN: f64 = -128.0;
pub const ELEVATION_MAX: f64 = 127.0;

/// Minimum separation between consecutive elevation percentiles.
pub const PERCENTILE_GAP: f64 = 1.0;

pub const SLOPE_MIN: f64 = 0.1;
pub const SLOPE_MAX: f64 = 89.9;
pub const SLOPE_GAP: f64 = 0.1;

pub const RUGGEDNESS_RANGE: (f64, f64) = (0.05, 3.0);
pub const RIVER_DENSITY_RANGE: (f64, f64) = (0.001, 0.35);
pub const LAKE_COVERAGE_RANGE: (f64, f64) = (0.0, 0.35);

pub const DEFAULT_CELL_METERS: f64 = 100.0;

/// Statistical fingerprint used to calibrate generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub cell_meters: f64,
    pub elev_p10: f64,
    pub elev_p50: f64,
    pub elev_p90: f64,
    /// Degrees
    pub slope_p50: f64,
    /// Degrees
    pub slope_p90: f64,
    /// Normalized elevation standard deviation
    pub ruggedness: f64,
    /// Fraction of cells that are river
    pub river_density: f64,
    /// Fraction of cells that are lake
    pub lake_coverage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Errors writing a profile file.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid profile id {0:?}")]
    InvalidId(String),
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

impl Profile {
    /// Fallback used when no profile exists for a location. Matches the
    /// statistics of uncalibrated generation.
    pub fn default_profile() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            cell_meters: DEFAULT_CELL_METERS,
            elev_p10: -22.0,
            elev_p50: 4.0,
            elev_p90: 34.0,
            slope_p50: 3.5,
            slope_p90: 11.0,
            ruggedness: 0.6,
            river_density: 0.04,
            lake_coverage: 0.03,
            notes: Some("built-in fallback, uncalibrated".to_string()),
            source: None,
        }
    }

    /// Repair every field into its invariant range.
    pub fn normalize(&mut self) {
        let d = Profile::default_profile();

        if !(self.cell_meters.is_finite() && self.cell_meters > 0.0) {
            self.cell_meters = DEFAULT_CELL_METERS;
        }

        let mut p = [
            finite_or(self.elev_p10, d.elev_p10),
            finite_or(self.elev_p50, d.elev_p50),
            finite_or(self.elev_p90, d.elev_p90),
        ];
        p.sort_by(|a, b| a.total_cmp(b));
        // Leave room for two gaps above p10
        let p10 = p[0].clamp(ELEVATION_MIN, ELEVATION_MAX - 2.0 * PERCENTILE_GAP);
        let p50 = p[1].clamp(p10 + PERCENTILE_GAP, ELEVATION_MAX - PERCENTILE_GAP);
        let p90 = p[2].clamp(p50 + PERCENTILE_GAP, ELEVATION_MAX);
        self.elev_p10 = p10;
        self.elev_p50 = p50;
        self.elev_p90 = p90;

        let s50 = finite_or(self.slope_p50, d.slope_p50).clamp(SLOPE_MIN, SLOPE_MAX - SLOPE_GAP);
        let s90_floor = (s50 + SLOPE_GAP).min(SLOPE_MAX);
        let s90 = finite_or(self.slope_p90, d.slope_p90).clamp(s90_floor, SLOPE_MAX);
        self.slope_p50 = s50;
        self.slope_p90 = s90;

        self.ruggedness = finite_or(self.ruggedness, d.ruggedness)
            .clamp(RUGGEDNESS_RANGE.0, RUGGEDNESS_RANGE.1);
        self.river_density = finite_or(self.river_density, d.river_density)
            .clamp(RIVER_DENSITY_RANGE.0, RIVER_DENSITY_RANGE.1);
        self.lake_coverage = finite_or(self.lake_coverage, d.lake_coverage)
            .clamp(LAKE_COVERAGE_RANGE.0, LAKE_COVERAGE_RANGE.1);
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// True when every invariant holds without repair.
    pub fn is_valid(&self) -> bool {
        self.cell_meters.is_finite()
            && self.cell_meters > 0.0
            && self.elev_p10 >= ELEVATION_MIN
            && self.elev_p90 <= ELEVATION_MAX
            && self.elev_p50 - self.elev_p10 >= PERCENTILE_GAP
            && self.elev_p90 - self.elev_p50 >= PERCENTILE_GAP
            && self.slope_p50 > 0.0
            && self.slope_p50 < self.slope_p90
            && (RUGGEDNESS_RANGE.0..=RUGGEDNESS_RANGE.1).contains(&self.ruggedness)
            && (RIVER_DENSITY_RANGE.0..=RIVER_DENSITY_RANGE.1).contains(&self.river_density)
            && (LAKE_COVERAGE_RANGE.0..=LAKE_COVERAGE_RANGE.1).contains(&self.lake_coverage)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")?;
        Ok(())
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::default_profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Profile::default_profile().is_valid());
    }

    #[test]
    fn test_normalize_repairs_ordering() {
        let mut p = Profile::default_profile();
        p.elev_p10 = 40.0;
        p.elev_p50 = 40.0;
        p.elev_p90 = -10.0;
        p.normalize();
        assert_eq!(p.elev_p10, -10.0);
        assert_eq!(p.elev_p50, 40.0);
        assert_eq!(p.elev_p90, 41.0);
        assert!(p.is_valid());
    }

    #[test]
    fn test_normalize_clamps_ranges() {
        let mut p = Profile::default_profile();
        p.elev_p10 = 500.0;
        p.elev_p50 = 500.0;
        p.elev_p90 = 500.0;
        p.slope_p50 = 0.0;
        p.slope_p90 = -3.0;
        p.ruggedness = 9.0;
        p.river_density = 0.0;
        p.lake_coverage = 1.0;
        p.cell_meters = f64::NAN;
        p.normalize();

        assert_eq!(p.elev_p90, ELEVATION_MAX);
        assert_eq!(p.elev_p50, ELEVATION_MAX - 1.0);
        assert_eq!(p.elev_p10, ELEVATION_MAX - 2.0);
        assert!(p.slope_p50 > 0.0 && p.slope_p50 < p.slope_p90);
        assert_eq!(p.ruggedness, 3.0);
        assert_eq!(p.river_density, 0.001);
        assert_eq!(p.lake_coverage, 0.35);
        assert_eq!(p.cell_meters, DEFAULT_CELL_METERS);
        assert!(p.is_valid());
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(Profile::default_profile()).unwrap();
        for key in [
            "id", "name", "cell_meters", "elev_p10", "elev_p50", "elev_p90",
            "slope_p50", "slope_p90", "ruggedness", "river_density", "lake_coverage",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json.get("source").is_none());
    }
}
