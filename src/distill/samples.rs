//! Sample grid layout and its on-disk cache.
//!
//! Cache files live at `{cache_root}/samples/{hash:016x}.bin`, where the
//! hash is xxh64 over the normalized bbox, grid size and zoom. A hit means
//! a repeated distillation over the same area never opens a tile.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xxhash_rust::xxh64::xxh64;

use crate::tilemap::Tilemap;

use super::bbox::BoundingBox;
use super::DistillError;

/// Fewest samples per axis.
pub const MIN_SAMPLES: usize = 14;

/// Elevations (meters) sampled on a regular grid, row 0 at the north edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleGrid {
    pub cols: usize,
    pub rows: usize,
    pub zoom: u8,
    pub elevations: Vec<f32>,
}

impl SampleGrid {
    pub fn to_tilemap(&self) -> Option<Tilemap<f32>> {
        Tilemap::from_vec(self.cols, self.rows, self.elevations.clone())
    }
}

/// Samples per axis for a bbox at the given cell size, each clamped to
/// `[MIN_SAMPLES, sample_cap]`.
pub fn grid_dimensions(bbox: &BoundingBox, cell_meters: f64, sample_cap: usize) -> (usize, usize) {
    let cap = sample_cap.max(MIN_SAMPLES);
    let cell = if cell_meters.is_finite() && cell_meters > 0.0 { cell_meters } else { 100.0 };
    let (width_m, height_m) = bbox.extent_meters();
    let axis = |meters: f64| ((meters / cell).round() as usize).clamp(MIN_SAMPLES, cap);
    (axis(width_m), axis(height_m))
}

/// (lat, lon) of every sample center, row-major from the north-west corner.
pub fn sample_points(bbox: &BoundingBox, cols: usize, rows: usize) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        let lat = bbox.max_lat - (r as f64 + 0.5) / rows as f64 * bbox.lat_span();
        for c in 0..cols {
            let lon = bbox.min_lon + (c as f64 + 0.5) / cols as f64 * bbox.lon_span();
            points.push((lat, lon));
        }
    }
    points
}

/// Content hash identifying one sampling configuration.
pub fn cache_key(bbox: &BoundingBox, cols: usize, rows: usize, zoom: u8) -> u64 {
    let canonical = format!(
        "{:.6},{:.6},{:.6},{:.6}|{}x{}|z{}",
        bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat, cols, rows, zoom
    );
    xxh64(canonical.as_bytes(), 0)
}

/// Disk cache of sample grids.
pub struct SampleCache {
    dir: PathBuf,
}

impl SampleCache {
    pub fn new<P: AsRef<Path>>(cache_root: P) -> Self {
        Self {
            dir: cache_root.as_ref().join("samples"),
        }
    }

    pub fn path_for(&self, key: u64) -> PathBuf {
        self.dir.join(format!("{:016x}.bin", key))
    }

    /// Cached grid, or `None` on a miss or an unreadable file.
    pub fn load(&self, key: u64, cols: usize, rows: usize) -> Option<SampleGrid> {
        let path = self.path_for(key);
        let file = File::open(&path).ok()?;
        match bincode::deserialize_from::<_, SampleGrid>(BufReader::new(file)) {
            Ok(grid) if grid.cols == cols && grid.rows == rows && grid.elevations.len() == cols * rows => {
                debug!(path = %path.display(), "sample cache hit");
                Some(grid)
            }
            Ok(_) => {
                warn!(path = %path.display(), "sample cache entry has wrong shape, ignoring");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable sample cache entry, ignoring");
                None
            }
        }
    }

    pub fn save(&self, key: u64, grid: &SampleGrid) -> Result<(), DistillError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("bin.part");
        let mut writer = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut writer, grid)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_grid_dimensions_clamped() {
        // ~11 km x 11 km at the equator
        let b = BoundingBox::new(0.0, 0.0, 0.1, 0.1);
        assert_eq!(grid_dimensions(&b, 100.0, 96), (96, 96));
        assert_eq!(grid_dimensions(&b, 500.0, 96), (22, 22));
        assert_eq!(grid_dimensions(&b, 5000.0, 96), (14, 14));
        // A cap below the floor is raised to it
        assert_eq!(grid_dimensions(&b, 100.0, 3), (14, 14));
    }

    #[test]
    fn test_sample_points_layout() {
        let b = BoundingBox::new(10.0, 40.0, 12.0, 41.0);
        let pts = sample_points(&b, 4, 2);
        assert_eq!(pts.len(), 8);
        // First row is the northern one, first column the western one
        assert!((pts[0].0 - 40.75).abs() < 1e-12);
        assert!((pts[0].1 - 10.25).abs() < 1e-12);
        assert!((pts[7].0 - 40.25).abs() < 1e-12);
        assert!((pts[7].1 - 11.75).abs() < 1e-12);
    }

    #[test]
    fn test_cache_key_sensitivity() {
        let b = BoundingBox::new(10.0, 40.0, 12.0, 41.0);
        let k = cache_key(&b, 20, 20, 11);
        assert_eq!(k, cache_key(&b, 20, 20, 11));
        assert_ne!(k, cache_key(&b, 20, 21, 11));
        assert_ne!(k, cache_key(&b, 20, 20, 12));
        assert_ne!(k, cache_key(&BoundingBox::new(10.0, 40.0, 12.0, 41.5), 20, 20, 11));
    }

    #[test]
    fn test_sample_cache_save_load() {
        let dir = tempdir().unwrap();
        let cache = SampleCache::new(dir.path());
        let grid = SampleGrid { cols: 2, rows: 2, zoom: 9, elevations: vec![1.0, 2.0, 3.0, 4.5] };

        assert!(cache.load(7, 2, 2).is_none());
        cache.save(7, &grid).unwrap();
        assert_eq!(cache.load(7, 2, 2), Some(grid));
        // Wrong expected shape is a miss
        assert!(cache.load(7, 3, 2).is_none());
    }
}
