//! Deterministic value noise built from a pure lattice hash.
//!
//! There is no RNG stream anywhere in generation: every lattice value is a
//! function of `(seed, gx, gy, channel salt, octave)`, so the same inputs
//! always produce the same field.

use xxhash_rust::xxh64::xxh64;

use crate::tilemap::Tilemap;

/// Lattice spacing (in grid cells) of each octave, coarsest first.
pub const OCTAVE_SCALES: [f64; 4] = [52.0, 26.0, 13.0, 6.0];

/// Independent noise channels. Each gets its own salt so fields generated
/// from the same seed are uncorrelated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Elevation,
    Ridge,
    Moisture,
    Temperature,
    Roughness,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Elevation => "elevation",
            Channel::Ridge => "ridge",
            Channel::Moisture => "moisture",
            Channel::Temperature => "temperature",
            Channel::Roughness => "roughness",
        }
    }

    /// Stable per-channel salt. xxh64 is specified byte-for-byte, unlike
    /// `DefaultHasher`, so salts do not drift between toolchains.
    pub fn salt(&self) -> u64 {
        xxh64(self.name().as_bytes(), 0)
    }
}

/// splitmix64 finalizer
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hash a lattice point. Pure: no state, no allocation.
#[inline]
pub fn lattice_hash(seed: u64, gx: i64, gy: i64, salt: u64, octave: u32) -> u64 {
    let mut h = mix64(seed ^ salt);
    h = mix64(h ^ (gx as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    h = mix64(h ^ (gy as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f));
    mix64(h ^ (octave as u64 + 1).wrapping_mul(0x1656_67b1_9e37_79f9))
}

/// Lattice value in [0, 1).
#[inline]
fn lattice_value(seed: u64, gx: i64, gy: i64, salt: u64, octave: u32) -> f64 {
    // Top 53 bits give a uniformly spaced f64 mantissa
    (lattice_hash(seed, gx, gy, salt, octave) >> 11) as f64 / (1u64 << 53) as f64
}

/// Single octave of bilinear value noise at lattice spacing `scale`.
pub fn value_noise(seed: u64, x: f64, y: f64, salt: u64, octave: u32, scale: f64) -> f64 {
    let fx = x / scale;
    let fy = y / scale;
    let gx = fx.floor();
    let gy = fy.floor();
    let tx = fx - gx;
    let ty = fy - gy;
    let gx = gx as i64;
    let gy = gy as i64;

    let v00 = lattice_value(seed, gx, gy, salt, octave);
    let v10 = lattice_value(seed, gx + 1, gy, salt, octave);
    let v01 = lattice_value(seed, gx, gy + 1, salt, octave);
    let v11 = lattice_value(seed, gx + 1, gy + 1, salt, octave);

    let top = v00 + (v10 - v00) * tx;
    let bottom = v01 + (v11 - v01) * tx;
    top + (bottom - top) * ty
}

/// Four-octave fractal sum, amplitude halving per octave, normalized to [0, 1].
pub fn fbm(seed: u64, channel: Channel, x: f64, y: f64) -> f64 {
    let salt = channel.salt();
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut norm = 0.0;

    for (octave, &scale) in OCTAVE_SCALES.iter().enumerate() {
        total += value_noise(seed, x, y, salt, octave as u32, scale) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
    }

    total / norm
}

/// Sample a whole channel over a `width x height` grid.
pub fn noise_field(seed: u64, channel: Channel, width: usize, height: usize) -> Tilemap<f32> {
    let mut field = Tilemap::new_with(width, height, 0.0f32);
    for (x, y, value) in field.iter_mut() {
        *value = fbm(seed, channel, x as f64, y as f64) as f32;
    }
    field
}
