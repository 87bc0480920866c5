//! Terrain descriptors computed over a sampled elevation grid (meters).

use crate::hydrology::{compute_flow_accumulation, compute_flow_direction};
use crate::stats::{mean_stddev, percentile, sorted};
use crate::tilemap::Tilemap;

/// Meters per abstract elevation unit.
pub const METERS_PER_UNIT: f64 = 24.0;

/// Standard deviation (meters) that maps to ruggedness 1.0.
pub const RUGGEDNESS_SCALE_M: f64 = 400.0;
pub const RUGGEDNESS_CLAMP: (f64, f64) = (0.08, 2.4);

/// Flow accumulation percentile that counts as "river".
pub const RIVER_PERCENTILE: f64 = 0.94;
pub const RIVER_CLAMP: (f64, f64) = (0.01, 0.22);

/// Lake candidates must be at or below this elevation percentile.
pub const LAKE_PERCENTILE: f64 = 0.24;
/// Strict pits are sparse at sample resolution; scale up toward real coverage.
pub const LAKE_SCALE: f64 = 6.0;
pub const LAKE_CLAMP: (f64, f64) = (0.003, 0.14);

/// Raw descriptors before rounding and normalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Descriptors {
    pub elev_p10: f64,
    pub elev_p50: f64,
    pub elev_p90: f64,
    pub slope_p50: f64,
    pub slope_p90: f64,
    pub ruggedness: f64,
    pub river_density: f64,
    pub lake_coverage: f64,
}

/// Compute every descriptor. `spacing` is the (x, y) distance between
/// adjacent samples in meters.
pub fn describe(elevations: &Tilemap<f32>, spacing: (f64, f64)) -> Descriptors {
    let (elev_p10, elev_p50, elev_p90) = elevation_percentiles(elevations);
    let (slope_p50, slope_p90) = slope_percentiles(elevations, spacing);
    Descriptors {
        elev_p10,
        elev_p50,
        elev_p90,
        slope_p50,
        slope_p90,
        ruggedness: ruggedness(elevations),
        river_density: river_density(elevations),
        lake_coverage: lake_coverage(elevations),
    }
}

fn to_units(meters: f64) -> f64 {
    (meters / METERS_PER_UNIT).clamp(-128.0, 127.0)
}

/// p10/p50/p90 in abstract units.
pub fn elevation_percentiles(elevations: &Tilemap<f32>) -> (f64, f64, f64) {
    let values = sorted(elevations.as_slice().iter().map(|&e| e as f64));
    (
        to_units(percentile(&values, 0.10)),
        to_units(percentile(&values, 0.50)),
        to_units(percentile(&values, 0.90)),
    )
}

/// Slope in degrees at every interior sample, from central differences.
/// The border ring has no two-sided neighbors and is skipped.
pub fn slopes(elevations: &Tilemap<f32>, spacing: (f64, f64)) -> Vec<f64> {
    let (dx, dy) = spacing;
    let (w, h) = (elevations.width, elevations.height);
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity((w - 2) * (h - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (*elevations.get(x + 1, y) - *elevations.get(x - 1, y)) as f64 / (2.0 * dx);
            let gy = (*elevations.get(x, y + 1) - *elevations.get(x, y - 1)) as f64 / (2.0 * dy);
            out.push(gx.hypot(gy).atan().to_degrees());
        }
    }
    out
}

pub fn slope_percentiles(elevations: &Tilemap<f32>, spacing: (f64, f64)) -> (f64, f64) {
    let values = sorted(slopes(elevations, spacing));
    (percentile(&values, 0.50), percentile(&values, 0.90))
}

/// Population stddev of elevation, normalized and clamped.
pub fn ruggedness(elevations: &Tilemap<f32>) -> f64 {
    let values: Vec<f64> = elevations.as_slice().iter().map(|&e| e as f64).collect();
    let (_, sd) = mean_stddev(&values);
    (sd / RUGGEDNESS_SCALE_M).clamp(RUGGEDNESS_CLAMP.0, RUGGEDNESS_CLAMP.1)
}

/// Fraction of samples whose flow accumulation reaches the 94th percentile.
pub fn river_density(elevations: &Tilemap<f32>) -> f64 {
    let flow_dir = compute_flow_direction(elevations, |_, _| true);
    let accumulation = compute_flow_accumulation(elevations, &flow_dir);

    let values = sorted(accumulation.as_slice().iter().map(|&a| a as f64));
    let threshold = percentile(&values, RIVER_PERCENTILE);
    let above = values.iter().filter(|&&a| a >= threshold).count();

    (above as f64 / values.len().max(1) as f64).clamp(RIVER_CLAMP.0, RIVER_CLAMP.1)
}

/// Scaled fraction of low interior samples that are strict local minima.
pub fn lake_coverage(elevations: &Tilemap<f32>) -> f64 {
    let (w, h) = (elevations.width, elevations.height);
    if w < 3 || h < 3 {
        return LAKE_CLAMP.0;
    }

    let values = sorted(elevations.as_slice().iter().map(|&e| e as f64));
    let low = percentile(&values, LAKE_PERCENTILE);

    let mut pits = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let e = *elevations.get(x, y);
            if e as f64 > low {
                continue;
            }
            if elevations.neighbors_8(x, y).iter().all(|&(nx, ny)| *elevations.get(nx, ny) > e) {
                pits += 1;
            }
        }
    }

    let interior = ((w - 2) * (h - 2)) as f64;
    (pits as f64 / interior * LAKE_SCALE).clamp(LAKE_CLAMP.0, LAKE_CLAMP.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(w: usize, h: usize, f: impl Fn(usize, usize) -> f32) -> Tilemap<f32> {
        let mut map = Tilemap::new_with(w, h, 0.0f32);
        for (x, y, v) in map.iter_mut() {
            *v = f(x, y);
        }
        map
    }

    #[test]
    fn test_elevation_units() {
        let map = grid(10, 10, |x, y| (x + 10 * y) as f32 * 24.0);
        let (p10, p50, p90) = elevation_percentiles(&map);
        assert!((p10 - 9.9).abs() < 1e-9);
        assert!((p50 - 49.5).abs() < 1e-9);
        assert!((p90 - 89.1).abs() < 1e-9);

        let very_high = grid(4, 4, |_, _| 8000.0);
        assert_eq!(elevation_percentiles(&very_high).2, 127.0);
    }

    #[test]
    fn test_slope_of_plane() {
        // 100 m rise per 100 m run: 45 degrees everywhere
        let map = grid(6, 6, |x, _| x as f32 * 100.0);
        let s = slopes(&map, (100.0, 100.0));
        assert_eq!(s.len(), 16);
        for v in s {
            assert!((v - 45.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_border_ring_excluded() {
        // A spike on the border does not register
        let map = grid(5, 5, |x, y| if x == 0 && y == 2 { 10_000.0 } else { 0.0 });
        let (p50, p90) = slope_percentiles(&map, (30.0, 30.0));
        assert!(p90 > 0.0);
        assert_eq!(p50, 0.0);
        let flat = grid(5, 5, |_, _| 0.0);
        assert_eq!(slope_percentiles(&flat, (30.0, 30.0)), (0.0, 0.0));
    }

    #[test]
    fn test_ruggedness_clamped() {
        assert_eq!(ruggedness(&grid(8, 8, |_, _| 5.0)), RUGGEDNESS_CLAMP.0);
        let steep = grid(8, 8, |x, _| if x % 2 == 0 { 0.0 } else { 4000.0 });
        assert_eq!(ruggedness(&steep), RUGGEDNESS_CLAMP.1);
        let moderate = grid(8, 8, |x, _| if x % 2 == 0 { 0.0 } else { 400.0 });
        assert!((ruggedness(&moderate) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_river_density_of_valley() {
        // V-shaped valley draining south: flow concentrates in the center column
        let map = grid(21, 21, |x, y| (x as f32 - 10.0).abs() * 10.0 + (20 - y) as f32);
        let d = river_density(&map);
        assert!((RIVER_CLAMP.0..=RIVER_CLAMP.1).contains(&d));
        assert!(d < 0.1);
    }

    #[test]
    fn test_river_density_exact_fraction() {
        // Single chain draining east: accumulation 1,2,3,4,5.
        // p94 = 4 + 0.76 = 4.76, so only the outlet reaches it: 1/5
        let chain = grid(5, 1, |x, _| (5 - x) as f32);
        assert!((river_density(&chain) - 0.2).abs() < 1e-12);

        // Two parallel chains ending in level outlets that cannot drain into
        // each other. Sorted 1,1,2,2,..,5,5 gives p94 = 5 exactly, and both
        // outlets equal to it are counted: 2/10
        let twin = grid(5, 2, |x, y| if x == 4 { 2.0 } else { (10 - 2 * x) as f32 + 0.5 * y as f32 });
        assert!((river_density(&twin) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_river_density_flat_has_no_flow() {
        // No strictly lower neighbor anywhere: every accumulation is 1, all
        // samples sit at the threshold and the fraction clamps to the ceiling
        let flat = grid(6, 6, |_, _| 300.0);
        assert_eq!(river_density(&flat), RIVER_CLAMP.1);
    }

    #[test]
    fn test_lake_coverage_counts_pits() {
        // Gentle slope with four isolated pits in the low half
        let pits = [(3, 14), (8, 15), (13, 16), (5, 17)];
        let map = grid(20, 20, |x, y| {
            if pits.contains(&(x, y)) { -50.0 } else { 100.0 - y as f32 }
        });
        let expected = (4.0 / 324.0 * LAKE_SCALE).clamp(LAKE_CLAMP.0, LAKE_CLAMP.1);
        assert!((lake_coverage(&map) - expected).abs() < 1e-12);

        let slope = grid(20, 20, |_, y| 100.0 - y as f32);
        assert_eq!(lake_coverage(&slope), LAKE_CLAMP.0);
    }
}
