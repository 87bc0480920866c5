//! Elevation tile access: slippy-map coordinate math, terrarium decoding,
//! network fetch with retry, and a memory + disk tile cache.

pub mod cache;
pub mod coords;
pub mod decode;
pub mod fetch;

use thiserror::Error;

pub use cache::{CacheStats, TileCache};
pub use coords::{select_zoom, TilePixel};
pub use decode::DecodedTile;
pub use fetch::{CancelToken, HttpTileSource, TileSource};

/// Address of one map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Errors while fetching, decoding or caching tiles.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("tile {key}: HTTP status {status}")]
    Status { key: TileKey, status: u16 },
    #[error("tile {key}: transport error: {message}")]
    Transport { key: TileKey, message: String },
    #[error("tile decode error: {0}")]
    Decode(String),
    #[error("tile {key}: giving up after {attempts} attempts: {last}")]
    Exhausted {
        key: TileKey,
        attempts: u32,
        last: Box<TileError>,
    },
    #[error("tile fetch cancelled")]
    Cancelled,
    #[error("tile fetch deadline exceeded")]
    DeadlineExceeded,
    #[error("tile cache IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for TileError {
    fn from(e: image::ImageError) -> Self {
        TileError::Decode(e.to_string())
    }
}
