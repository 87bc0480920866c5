//! Profile distillation: sample real elevation over a bounding box and
//! reduce it to the statistics generation is calibrated against.
//!
//! Pipeline: validate bbox -> size sample grid -> pick tile zoom ->
//! sample (sample cache, else tile cache) -> descriptors -> `Profile`.

pub mod bbox;
pub mod samples;
pub mod stats;

use thiserror::Error;
use tracing::info;

use crate::config::DistillConfig;
use crate::profile::Profile;
use crate::stats::round_to;
use crate::tilemap::Tilemap;
use crate::tiles::{select_zoom, CancelToken, HttpTileSource, TileCache, TileError, TileSource};

pub use bbox::BoundingBox;
pub use samples::{SampleCache, SampleGrid};

#[derive(Debug, Error)]
pub enum DistillError {
    #[error("invalid bounding box: {0}")]
    InvalidBbox(String),
    #[error("invalid cell size {0}: must be a positive number of meters")]
    InvalidCell(f64),
    #[error("corrupt sample grid: {0}")]
    CorruptSamples(String),
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sample cache error: {0}")]
    Cache(#[from] bincode::Error),
}

/// Reject cell sizes the grid sizing and zoom selection cannot agree on.
pub fn validate_cell_meters(cell_meters: f64) -> Result<f64, DistillError> {
    if cell_meters.is_finite() && cell_meters > 0.0 {
        Ok(cell_meters)
    } else {
        Err(DistillError::InvalidCell(cell_meters))
    }
}

/// Parse and validate a `--cell` argument.
pub fn parse_cell_meters(s: &str) -> Result<f64, String> {
    let cell: f64 = s.trim().parse().map_err(|_| format!("not a number: {:?}", s))?;
    validate_cell_meters(cell).map_err(|e| e.to_string())
}

fn elevation_map(grid: &SampleGrid) -> Result<Tilemap<f32>, DistillError> {
    grid.to_tilemap().ok_or_else(|| {
        DistillError::CorruptSamples(format!(
            "{} elevations for a {}x{} grid",
            grid.elevations.len(),
            grid.cols,
            grid.rows
        ))
    })
}

pub struct Distiller {
    tiles: TileCache,
    samples: SampleCache,
    cancel: CancelToken,
}

impl Distiller {
    /// Distiller backed by the HTTP tile source described by `config`.
    pub fn new(config: DistillConfig) -> Result<Self, DistillError> {
        let source = HttpTileSource::new(config.clone())?;
        Ok(Self::with_source(config, Box::new(source)))
    }

    pub fn with_source(config: DistillConfig, source: Box<dyn TileSource>) -> Self {
        Self {
            tiles: TileCache::new(&config.cache_root, source, config.max_attempts, config.backoff_base),
            samples: SampleCache::new(&config.cache_root),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tiles
    }

    /// Distill the area inside `bbox`. The result carries the placeholder
    /// id `distilled`; see [`Distiller::distill_named`].
    ///
    /// Decoded tiles are shared within one call only; each call starts
    /// from an empty memory cache.
    pub fn distill(
        &mut self,
        bbox: &BoundingBox,
        cell_meters: f64,
        sample_cap: usize,
    ) -> Result<Profile, DistillError> {
        let bbox = bbox.normalized()?;
        let cell_meters = validate_cell_meters(cell_meters)?;
        self.tiles.begin_run();

        let grid = self.sample_grid(&bbox, cell_meters, sample_cap)?;
        let elevations = elevation_map(&grid)?;

        let (width_m, height_m) = bbox.extent_meters();
        let spacing = (width_m / grid.cols as f64, height_m / grid.rows as f64);
        let d = stats::describe(&elevations, spacing);

        let profile = Profile {
            id: "distilled".to_string(),
            name: "Distilled area".to_string(),
            cell_meters,
            elev_p10: round_to(d.elev_p10, 1),
            elev_p50: round_to(d.elev_p50, 1),
            elev_p90: round_to(d.elev_p90, 1),
            slope_p50: round_to(d.slope_p50, 3),
            slope_p90: round_to(d.slope_p90, 3),
            ruggedness: round_to(d.ruggedness, 3),
            river_density: round_to(d.river_density, 3),
            lake_coverage: round_to(d.lake_coverage, 3),
            notes: Some(format!(
                "distilled from {}x{} samples at z{} over bbox {}",
                grid.cols, grid.rows, grid.zoom, bbox
            )),
            source: None,
        }
        .normalized();

        info!(
            cols = grid.cols,
            rows = grid.rows,
            zoom = grid.zoom,
            p50 = profile.elev_p50,
            ruggedness = profile.ruggedness,
            "distilled profile"
        );
        Ok(profile)
    }

    /// [`Distiller::distill`] with the caller's identity and provenance.
    pub fn distill_named(
        &mut self,
        id: &str,
        name: &str,
        source: Option<String>,
        bbox: &BoundingBox,
        cell_meters: f64,
        sample_cap: usize,
    ) -> Result<Profile, DistillError> {
        let mut profile = self.distill(bbox, cell_meters, sample_cap)?;
        profile.id = id.to_string();
        profile.name = name.to_string();
        profile.source = source;
        Ok(profile)
    }

    fn sample_grid(
        &mut self,
        bbox: &BoundingBox,
        cell_meters: f64,
        sample_cap: usize,
    ) -> Result<SampleGrid, DistillError> {
        let (cols, rows) = samples::grid_dimensions(bbox, cell_meters, sample_cap);
        let zoom = select_zoom(cell_meters, bbox.mid_lat());
        let key = samples::cache_key(bbox, cols, rows, zoom);

        if let Some(grid) = self.samples.load(key, cols, rows) {
            return Ok(grid);
        }

        info!(%bbox, cols, rows, zoom, "sampling elevation tiles");
        let points = samples::sample_points(bbox, cols, rows);
        let elevations = self.tiles.sample(&points, zoom, &self.cancel)?;
        let grid = SampleGrid { cols, rows, zoom, elevations };
        self.samples.save(key, &grid)?;
        Ok(grid)
    }
}
