//! World topology generator.
//!
//! `generate` is a pure function of `(seed, biome label, width, height)`;
//! `generate_calibrated` additionally takes a [`Profile`] and bends the
//! elevation distribution, river density and lake coverage toward it.
//! Neither has any fallible path and neither touches global state, so two
//! calls with the same arguments produce bit-identical grids.
//!
//! Pipeline:
//! 1. Elevation = base noise + ridged term (+ percentile remap if calibrated)
//! 2. Temperature and moisture from noise, latitude, label biases, altitude
//! 3. Biome classification
//! 4. Water seeding (sea level, forced coastline for coastal labels)
//! 5. Drainage: steepest-descent routing + flow accumulation → rivers
//! 6. Lakes
//! 7. Coast flags and coastal rebiome
//! 8. Roughness

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::biomes::{classify, Biome, ClimateRules};
use crate::climate::{generate_moisture, generate_temperature};
use crate::hydrology::{compute_flow_accumulation, compute_flow_direction};
use crate::noise::{noise_field, Channel};
use crate::profile::Profile;
use crate::stats::{percentile, sorted};
use crate::tilemap::Tilemap;
use crate::world::{Cell, CellFlags, TerrainGrid};

/// Dimensions below this are raised to it.
pub const MIN_DIMENSION: usize = 8;

/// Cells with elevation strictly below this are standing water.
pub const WATER_LEVEL: i8 = -18;

/// Uncalibrated lakes: non-water cells below this elevation...
pub const LAKE_LEVEL: i8 = -8;
/// ...and wetter than this.
pub const LAKE_MOISTURE: u8 = 150;

/// Calibrated lakes only form on cells wetter than this.
const CALIBRATED_LAKE_MOISTURE: u8 = 140;

/// Uncalibrated river threshold is `cells / RIVER_AREA_DIVISOR`, at least `RIVER_MIN_FLOW`.
const RIVER_AREA_DIVISOR: usize = 160;
const RIVER_MIN_FLOW: u32 = 16;

/// Ruggedness the uncalibrated generator roughly corresponds to.
const REFERENCE_RUGGEDNESS: f64 = 0.6;

/// Cells above this elevation get one extra roughness point.
const HIGH_GROUND: i8 = 40;

/// Generate an uncalibrated grid.
pub fn generate(seed: u64, biome_label: &str, width: usize, height: usize) -> TerrainGrid {
    build(seed, biome_label, width, height, None)
}

/// Generate a grid whose statistics are pulled toward `profile`.
pub fn generate_calibrated(
    seed: u64,
    biome_label: &str,
    width: usize,
    height: usize,
    profile: &Profile,
) -> TerrainGrid {
    build(seed, biome_label, width, height, Some(profile))
}

/// Generate one grid per seed in parallel. Each grid is identical to what
/// the sequential call would produce.
pub fn generate_candidates(
    seeds: &[u64],
    biome_label: &str,
    width: usize,
    height: usize,
    profile: Option<&Profile>,
) -> Vec<TerrainGrid> {
    seeds
        .par_iter()
        .map(|&seed| build(seed, biome_label, width, height, profile))
        .collect()
}

fn build(
    seed: u64,
    biome_label: &str,
    width: usize,
    height: usize,
    profile: Option<&Profile>,
) -> TerrainGrid {
    let width = width.max(MIN_DIMENSION);
    let height = height.max(MIN_DIMENSION);
    let n = width * height;
    let rules = ClimateRules::for_label(biome_label);

    // 1. Elevation
    let heights = generate_heights(seed, width, height, profile);
    let mut elevation = Tilemap::new_with(width, height, 0i8);
    for (x, y, e) in elevation.iter_mut() {
        *e = quantize(*heights.get(x, y));
    }

    // 2-3. Climate and biomes
    let temperature = generate_temperature(seed, &elevation, &rules);
    let moisture = generate_moisture(seed, &elevation, &rules);
    let mut biomes = Tilemap::new_with(width, height, Biome::Forest);
    for (x, y, b) in biomes.iter_mut() {
        *b = classify(*elevation.get(x, y), *moisture.get(x, y), *temperature.get(x, y));
    }

    // 4. Water seeding
    let mut flags = Tilemap::new_with(width, height, CellFlags::empty());
    for (x, y, f) in flags.iter_mut() {
        let forced_coast = rules.coastal && elevation.is_border(x, y);
        if *elevation.get(x, y) < WATER_LEVEL || forced_coast {
            f.insert(CellFlags::WATER);
        }
    }

    // 5. Rivers
    let is_water = |flags: &Tilemap<CellFlags>, x: usize, y: usize| flags.get(x, y).contains(CellFlags::WATER);
    let flow_dir = compute_flow_direction(&heights, |x, y| !is_water(&flags, x, y));
    let accumulation = compute_flow_accumulation(&heights, &flow_dir);

    let rivers: Vec<usize> = match profile {
        None => {
            let threshold = ((n / RIVER_AREA_DIVISOR) as u32).max(RIVER_MIN_FLOW);
            (0..n)
                .filter(|&i| {
                    let (x, y) = flags.coords(i);
                    !is_water(&flags, x, y) && accumulation.as_slice()[i] > threshold
                })
                .collect()
        }
        Some(p) => {
            let target = (p.river_density * n as f64).round() as usize;
            let acc = accumulation.as_slice();
            let h = heights.as_slice();
            let mut candidates: Vec<usize> = (0..n)
                .filter(|&i| {
                    let (x, y) = flags.coords(i);
                    !is_water(&flags, x, y) && acc[i] >= 2
                })
                .collect();
            // Largest flow first; among equals prefer the downstream (lower) cell
            candidates.sort_by(|&a, &b| {
                acc[b].cmp(&acc[a]).then(h[a].total_cmp(&h[b])).then(a.cmp(&b))
            });
            candidates.truncate(target);
            candidates
        }
    };
    for &i in &rivers {
        let (x, y) = flags.coords(i);
        flags.get_mut(x, y).insert(CellFlags::RIVER | CellFlags::WATER);
    }

    // 6. Lakes
    let lakes: Vec<usize> = match profile {
        None => (0..n)
            .filter(|&i| {
                let (x, y) = flags.coords(i);
                !is_water(&flags, x, y)
                    && *elevation.get(x, y) < LAKE_LEVEL
                    && *moisture.get(x, y) > LAKE_MOISTURE
            })
            .collect(),
        Some(p) => {
            let target = (p.lake_coverage * n as f64).round() as usize;
            let h = heights.as_slice();
            let mut candidates: Vec<usize> = (0..n)
                .filter(|&i| {
                    let (x, y) = flags.coords(i);
                    !is_water(&flags, x, y)
                        && (*elevation.get(x, y) as f64) <= p.elev_p50
                        && *moisture.get(x, y) > CALIBRATED_LAKE_MOISTURE
                })
                .collect();
            candidates.sort_by(|&a, &b| h[a].total_cmp(&h[b]).then(a.cmp(&b)));
            candidates.truncate(target);
            candidates
        }
    };
    for &i in &lakes {
        let (x, y) = flags.coords(i);
        flags.get_mut(x, y).insert(CellFlags::LAKE | CellFlags::WATER);
    }

    // 7. Coast
    let mut coast = Vec::new();
    for (x, y, f) in flags.iter() {
        if f.contains(CellFlags::WATER) {
            continue;
        }
        if flags.neighbors(x, y).iter().any(|&(nx, ny)| is_water(&flags, nx, ny)) {
            coast.push((x, y));
        }
    }
    for (x, y) in coast {
        flags.get_mut(x, y).insert(CellFlags::COAST);
        let b = biomes.get_mut(x, y);
        if matches!(*b, Biome::Grassland | Biome::Desert) {
            *b = Biome::Forest;
        }
    }

    // 8. Roughness
    let rough_scale = profile
        .map(|p| (p.ruggedness / REFERENCE_RUGGEDNESS).clamp(0.5, 1.8))
        .unwrap_or(1.0);
    let rough_noise = noise_field(seed, Channel::Roughness, width, height);

    let mut cells = Vec::with_capacity(n);
    for y in 0..height {
        for x in 0..width {
            let e = *elevation.get(x, y);
            let biome = *biomes.get(x, y);
            let mut roughness = 1
                + (*rough_noise.get(x, y) as f64 * 4.0 * rough_scale).round() as i32
                + biome.roughness_bonus();
            if e > HIGH_GROUND {
                roughness += 1;
            }
            cells.push(Cell {
                elevation: e,
                moisture: *moisture.get(x, y),
                temperature: *temperature.get(x, y),
                biome,
                flags: *flags.get(x, y),
                roughness: roughness.clamp(1, 9) as u8,
            });
        }
    }

    let grid = TerrainGrid::new(width, height, cells);
    debug!(
        seed,
        biome_label,
        width,
        height,
        calibrated = profile.is_some(),
        rivers = rivers.len(),
        lakes = lakes.len(),
        "generated terrain"
    );
    grid
}

fn quantize(h: f32) -> i8 {
    h.round().clamp(-128.0, 127.0) as i8
}

/// Continuous elevation field in abstract units, before quantization.
fn generate_heights(seed: u64, width: usize, height: usize, profile: Option<&Profile>) -> Tilemap<f32> {
    let base = noise_field(seed, Channel::Elevation, width, height);
    let ridge = noise_field(seed, Channel::Ridge, width, height);
    let ridge_weight = profile
        .map(|p| (p.ruggedness / REFERENCE_RUGGEDNESS).clamp(0.4, 2.5))
        .unwrap_or(1.0) as f32;

    let mut heights = Tilemap::new_with(width, height, 0.0f32);
    for (x, y, h) in heights.iter_mut() {
        let b = *base.get(x, y);
        let r = (*ridge.get(x, y) - 0.5).abs();
        *h = (b - 0.5) * 180.0 + r * 140.0 * ridge_weight - 12.0;
    }

    if let Some(p) = profile {
        remap_to_profile(&mut heights, p);
    }

    for (_, _, h) in heights.iter_mut() {
        *h = h.clamp(-128.0, 127.0);
    }
    heights
}

/// Monotone piecewise-linear remap sending the field's p10/p50/p90 to the
/// profile's. Tails continue with the slope of the adjacent segment.
fn remap_to_profile(heights: &mut Tilemap<f32>, profile: &Profile) {
    let values = sorted(heights.as_slice().iter().map(|&h| h as f64));
    let q10 = percentile(&values, 0.10);
    let q50 = percentile(&values, 0.50);
    let q90 = percentile(&values, 0.90);

    let segment = |target_span: f64, source_span: f64| {
        if source_span > 1e-9 { target_span / source_span } else { 1.0 }
    };
    let low_slope = segment(profile.elev_p50 - profile.elev_p10, q50 - q10);
    let high_slope = segment(profile.elev_p90 - profile.elev_p50, q90 - q50);

    for (_, _, h) in heights.iter_mut() {
        let v = *h as f64;
        let mapped = if v <= q50 {
            profile.elev_p50 + (v - q50) * low_slope
        } else {
            profile.elev_p50 + (v - q50) * high_slope
        };
        *h = mapped as f32;
    }
}

/// Empirical statistics of a generated grid, in the same terms as a [`Profile`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TerrainSummary {
    pub elev_p10: f64,
    pub elev_p50: f64,
    pub elev_p90: f64,
    pub water_fraction: f64,
    pub river_fraction: f64,
    pub lake_fraction: f64,
    pub coast_fraction: f64,
    pub mean_roughness: f64,
}

impl TerrainSummary {
    pub fn of(grid: &TerrainGrid) -> Self {
        let elevations = sorted(grid.cells().iter().map(|c| c.elevation as f64));
        let n = grid.cells().len().max(1) as f64;
        Self {
            elev_p10: percentile(&elevations, 0.10),
            elev_p50: percentile(&elevations, 0.50),
            elev_p90: percentile(&elevations, 0.90),
            water_fraction: grid.fraction(|c| c.is_water()),
            river_fraction: grid.fraction(|c| c.is_river()),
            lake_fraction: grid.fraction(|c| c.is_lake()),
            coast_fraction: grid.fraction(|c| c.is_coast()),
            mean_roughness: grid.cells().iter().map(|c| c.roughness as f64).sum::<f64>() / n,
        }
    }
}
