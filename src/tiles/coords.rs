//! Web-Mercator slippy-map math for 256-pixel tiles.

use std::f64::consts::PI;

use super::TileKey;

pub const TILE_SIZE: u32 = 256;

/// Latitude limit of the square Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Ground resolution at zoom 0 on the equator, meters per pixel.
const EQUATOR_RESOLUTION: f64 = 156_543.033_92;

/// Zoom levels considered, finest first.
pub const ZOOM_CANDIDATES: [u8; 11] = [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5];

/// Bounds on the pixel resolution we aim for, meters.
const TARGET_RESOLUTION_FLOOR: f64 = 10.0;
const TARGET_RESOLUTION_CEILING: f64 = 600.0;

/// Meters per pixel at `lat` for zoom `z`.
pub fn ground_resolution(lat: f64, z: u8) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    EQUATOR_RESOLUTION * lat.cos() / (1u64 << z) as f64
}

/// Pixel resolution wanted for a given sample spacing. Sampling at half the
/// cell size keeps each sample inside its own pixel.
pub fn target_resolution(cell_meters: f64) -> f64 {
    (cell_meters * 0.5).clamp(TARGET_RESOLUTION_FLOOR, TARGET_RESOLUTION_CEILING)
}

/// Coarsest zoom whose resolution at `mid_lat` is fine enough for
/// `cell_meters`. Walks the candidates from finest to coarsest and keeps the
/// last one that still qualifies; if even the finest fails, uses the coarsest.
pub fn select_zoom(cell_meters: f64, mid_lat: f64) -> u8 {
    let target = target_resolution(cell_meters);
    let mut chosen = None;
    for &z in ZOOM_CANDIDATES.iter() {
        if ground_resolution(mid_lat, z) <= target {
            chosen = Some(z);
        } else {
            break;
        }
    }
    chosen.unwrap_or(ZOOM_CANDIDATES[ZOOM_CANDIDATES.len() - 1])
}

/// A tile plus the pixel inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePixel {
    pub key: TileKey,
    pub px: u32,
    pub py: u32,
}

/// Project (lat, lon) to the nearest tile pixel at zoom `z`. Longitude wraps,
/// latitude is clamped to the Mercator limit.
pub fn lat_lon_to_pixel(lat: f64, lon: f64, z: u8) -> TilePixel {
    let tiles = 1u64 << z;
    let world_px = (tiles * TILE_SIZE as u64) as f64;

    let gx = ((lon + 180.0) / 360.0 * world_px).rem_euclid(world_px);

    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let merc = (lat_rad.tan() + 1.0 / lat_rad.cos()).ln();
    let gy = ((1.0 - merc / PI) / 2.0 * world_px).clamp(0.0, world_px - 1.0);

    let gx = gx.floor() as u64;
    let gy = gy.floor() as u64;
    let size = TILE_SIZE as u64;

    TilePixel {
        key: TileKey::new(z, ((gx / size) % tiles) as u32, ((gy / size) % tiles) as u32),
        px: (gx % size) as u32,
        py: (gy % size) as u32,
    }
}

/// Center of a tile pixel as (lat, lon). Inverse of [`lat_lon_to_pixel`].
pub fn pixel_to_lat_lon(key: TileKey, px: u32, py: u32) -> (f64, f64) {
    let world_px = ((1u64 << key.z) * TILE_SIZE as u64) as f64;
    let gx = (key.x as u64 * TILE_SIZE as u64 + px as u64) as f64 + 0.5;
    let gy = (key.y as u64 * TILE_SIZE as u64 + py as u64) as f64 + 0.5;

    let lon = gx / world_px * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * gy / world_px);
    let lat = n.sinh().atan().to_degrees();
    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tile() {
        // Null Island sits on the corner of the four central tiles
        let p = lat_lon_to_pixel(0.0001, 0.0001, 1);
        assert_eq!(p.key, TileKey::new(1, 1, 0));

        // Seattle at zoom 12
        let p = lat_lon_to_pixel(47.6062, -122.3321, 12);
        assert_eq!((p.key.x, p.key.y), (656, 1430));
    }

    #[test]
    fn test_longitude_wraps() {
        let a = lat_lon_to_pixel(10.0, 190.0, 6);
        let b = lat_lon_to_pixel(10.0, -170.0, 6);
        assert_eq!(a, b);
        let c = lat_lon_to_pixel(10.0, 180.0, 6);
        assert_eq!(c.key.x, 0);
    }

    #[test]
    fn test_latitude_clamped() {
        let p = lat_lon_to_pixel(89.9, 0.0, 4);
        assert_eq!(p.key.y, 0);
        let p = lat_lon_to_pixel(-89.9, 0.0, 4);
        assert_eq!(p.key.y, 15);
        assert_eq!(p.py, 255);
    }

    #[test]
    fn test_pixel_round_trip() {
        let p = lat_lon_to_pixel(46.85, -121.76, 11);
        let (lat, lon) = pixel_to_lat_lon(p.key, p.px, p.py);
        assert_eq!(lat_lon_to_pixel(lat, lon, 11), p);
    }

    #[test]
    fn test_select_zoom() {
        // 100 m cells want <= 50 m pixels: z12 is ~38 m at the equator, z11 ~76 m
        assert_eq!(select_zoom(100.0, 0.0), 12);
        // Higher latitude shrinks pixels, so a coarser zoom suffices
        assert_eq!(select_zoom(100.0, 60.0), 11);
        // Tiny cells are held to the 10 m floor
        assert_eq!(select_zoom(1.0, 0.0), 14);
        // Huge cells hit the ceiling
        assert_eq!(select_zoom(50_000.0, 0.0), 9);
    }

    #[test]
    fn test_ground_resolution_halves_per_zoom() {
        let r10 = ground_resolution(30.0, 10);
        let r11 = ground_resolution(30.0, 11);
        assert!((r10 / r11 - 2.0).abs() < 1e-9);
    }
}
