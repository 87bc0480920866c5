//! Terrain generation library
//!
//! Distills real elevation data into compact terrain profiles and generates
//! deterministic, profile-calibrated terrain grids from them.

pub mod ascii;
pub mod biomes;
pub mod climate;
pub mod config;
pub mod distill;
pub mod export;
pub mod hydrology;
pub mod logging;
pub mod noise;
pub mod profile;
pub mod profile_store;
pub mod stats;
pub mod tilemap;
pub mod tiles;
pub mod topology;
pub mod world;

pub use profile::Profile;
pub use profile_store::ProfileStore;
pub use topology::{generate, generate_calibrated, generate_candidates, TerrainSummary};
pub use world::{Cell, CellFlags, TerrainGrid};
