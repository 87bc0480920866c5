//! Runtime configuration: where profiles live, where tiles come from and
//! where the distiller caches them.
//!
//! Defaults can be overridden through environment variables so that tools
//! and tests can point at scratch directories without code changes.

use std::path::PathBuf;
use std::time::Duration;

/// Overrides the profile directory used by the store.
pub const PROFILE_DIR_ENV: &str = "TOPOGEN_PROFILE_DIR";
/// Overrides the terrain tile URL template.
pub const TILE_URL_ENV: &str = "TOPOGEN_TILE_URL";
/// Overrides the distiller cache root.
pub const CACHE_DIR_ENV: &str = "TOPOGEN_CACHE_DIR";

pub const DEFAULT_PROFILE_DIR: &str = "assets/profiles";
pub const DEFAULT_CACHE_DIR: &str = ".cache/topogen";

/// Public terrarium tiles. `{z}`, `{x}`, `{y}` are substituted per request.
pub const DEFAULT_TILE_URL: &str =
    "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png";

/// Default upper bound on samples per axis.
pub const DEFAULT_SAMPLE_CAP: usize = 96;

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Profile directory, honoring `TOPOGEN_PROFILE_DIR`.
pub fn profile_dir() -> PathBuf {
    env_nonempty(PROFILE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE_DIR))
}

/// Distiller settings.
#[derive(Clone, Debug)]
pub struct DistillConfig {
    /// URL template with `{z}`, `{x}`, `{y}` placeholders
    pub tile_url: String,
    /// Root for tile and sample caches
    pub cache_root: PathBuf,
    /// Attempts per tile before giving up
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff_base * n`
    pub backoff_base: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            tile_url: DEFAULT_TILE_URL.to_string(),
            cache_root: PathBuf::from(DEFAULT_CACHE_DIR),
            max_attempts: 4,
            backoff_base: Duration::from_millis(400),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("topogen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DistillConfig {
    /// Defaults with `TOPOGEN_TILE_URL` / `TOPOGEN_CACHE_DIR` applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env_nonempty(TILE_URL_ENV) {
            config.tile_url = url;
        }
        if let Some(dir) = env_nonempty(CACHE_DIR_ENV) {
            config.cache_root = PathBuf::from(dir);
        }
        config
    }

    /// Concrete URL for one tile.
    pub fn tile_url_for(&self, z: u8, x: u32, y: u32) -> String {
        self.tile_url
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}
