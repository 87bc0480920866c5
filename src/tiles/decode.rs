//! Terrarium tile decoding.
//!
//! Each pixel stores elevation as `(R * 256 + G + B / 256) - 32768` meters.

use super::coords::TILE_SIZE;
use super::TileError;

/// Decoded elevations of one tile, row-major, meters.
#[derive(Clone, Debug)]
pub struct DecodedTile {
    size: u32,
    elevations: Vec<f32>,
}

/// Elevation in meters encoded by one terrarium pixel.
#[inline]
pub fn terrarium_elevation(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 * 256.0 + g as f32 + b as f32 / 256.0) - 32768.0
}

/// Inverse of [`terrarium_elevation`], used to build tiles.
pub fn terrarium_rgb(meters: f32) -> [u8; 3] {
    let v = (meters + 32768.0).clamp(0.0, 65535.996);
    let r = (v / 256.0).floor();
    let g = (v - r * 256.0).floor();
    let b = ((v - r * 256.0 - g) * 256.0).floor();
    [r as u8, g as u8, b as u8]
}

/// Decode PNG bytes into elevations. The tile must be square.
pub fn decode_terrarium(bytes: &[u8]) -> Result<DecodedTile, TileError> {
    let image = image::load_from_memory(bytes)?.to_rgb8();
    let (w, h) = image.dimensions();
    if w == 0 || w != h {
        return Err(TileError::Decode(format!("expected a square tile, got {}x{}", w, h)));
    }

    let elevations = image
        .pixels()
        .map(|p| terrarium_elevation(p.0[0], p.0[1], p.0[2]))
        .collect();

    Ok(DecodedTile { size: w, elevations })
}

impl DecodedTile {
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Elevation at a pixel given in 256-pixel tile space. Tiles of other
    /// sizes are sampled proportionally.
    pub fn elevation_at(&self, px: u32, py: u32) -> f32 {
        let sx = (px as u64 * self.size as u64 / TILE_SIZE as u64).min(self.size as u64 - 1);
        let sy = (py as u64 * self.size as u64 / TILE_SIZE as u64).min(self.size as u64 - 1);
        self.elevations[(sy * self.size as u64 + sx) as usize]
    }
}
