//! Two-level tile cache: in-memory for the current run, PNG files on disk
//! across runs, and the network only on a miss in both.
//!
//! Disk layout: `{cache_root}/tiles/{z}/{x}/{y}.png`. A network result is
//! written to disk only after it decodes successfully, so a cached file is
//! always a tile that was usable at least once.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::coords::lat_lon_to_pixel;
use super::decode::{decode_terrarium, DecodedTile};
use super::fetch::{CancelToken, TileSource};
use super::{TileError, TileKey};

/// Counters for one cache instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: usize,
    pub disk_hits: usize,
    /// Tiles successfully downloaded
    pub downloads: usize,
    /// Failed network attempts (including ones later retried successfully)
    pub failed_attempts: usize,
}

impl CacheStats {
    /// Format as human-readable string
    pub fn summary(&self) -> String {
        format!(
            "memory hits: {} | disk hits: {} | downloads: {} | failed attempts: {}",
            self.memory_hits, self.disk_hits, self.downloads, self.failed_attempts
        )
    }
}

pub struct TileCache {
    root: PathBuf,
    source: Box<dyn TileSource>,
    memory: HashMap<TileKey, DecodedTile>,
    max_attempts: u32,
    backoff_base: Duration,
    stats: CacheStats,
}

impl TileCache {
    /// `root` is the cache root; tiles go under `root/tiles`.
    pub fn new<P: AsRef<Path>>(
        root: P,
        source: Box<dyn TileSource>,
        max_attempts: u32,
        backoff_base: Duration,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            source,
            memory: HashMap::new(),
            max_attempts: max_attempts.max(1),
            backoff_base,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Start a new run: forget decoded tiles and reset the counters.
    /// Tiles on disk stay.
    pub fn begin_run(&mut self) {
        self.memory.clear();
        self.stats = CacheStats::default();
    }

    pub fn tile_path(&self, key: TileKey) -> PathBuf {
        self.root
            .join("tiles")
            .join(key.z.to_string())
            .join(key.x.to_string())
            .join(format!("{}.png", key.y))
    }

    /// Elevation (meters) for each (lat, lon), sampled at zoom `z`.
    pub fn sample(
        &mut self,
        points: &[(f64, f64)],
        z: u8,
        cancel: &CancelToken,
    ) -> Result<Vec<f32>, TileError> {
        let mut out = Vec::with_capacity(points.len());
        for &(lat, lon) in points {
            let pixel = lat_lon_to_pixel(lat, lon, z);
            let tile = self.tile(pixel.key, cancel)?;
            out.push(tile.elevation_at(pixel.px, pixel.py));
        }
        info!(points = points.len(), zoom = z, stats = %self.stats.summary(), "sampled elevation");
        Ok(out)
    }

    /// Get a decoded tile: memory, then disk, then network.
    pub fn tile(&mut self, key: TileKey, cancel: &CancelToken) -> Result<&DecodedTile, TileError> {
        if self.memory.contains_key(&key) {
            self.stats.memory_hits += 1;
        } else {
            let tile = match self.read_disk(key) {
                Some(tile) => {
                    self.stats.disk_hits += 1;
                    tile
                }
                None => self.download(key, cancel)?,
            };
            self.memory.insert(key, tile);
        }
        Ok(&self.memory[&key])
    }

    fn read_disk(&self, key: TileKey) -> Option<DecodedTile> {
        let path = self.tile_path(key);
        let bytes = fs::read(&path).ok()?;
        match decode_terrarium(&bytes) {
            Ok(tile) => {
                debug!(%key, "tile cache hit");
                Some(tile)
            }
            Err(e) => {
                warn!(%key, path = %path.display(), error = %e, "corrupt cached tile, refetching");
                None
            }
        }
    }

    fn write_disk(&self, key: TileKey, bytes: &[u8]) -> Result<(), TileError> {
        let path = self.tile_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write then rename so an interrupted run never leaves a truncated tile
        let tmp = path.with_extension("png.part");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Fetch with bounded retries. Cancellation is checked before every request.
    fn download(&mut self, key: TileKey, cancel: &CancelToken) -> Result<DecodedTile, TileError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            cancel.check()?;

            let result = self
                .source
                .fetch(key)
                .and_then(|bytes| decode_terrarium(&bytes).map(|tile| (bytes, tile)));

            match result {
                Ok((bytes, tile)) => {
                    self.write_disk(key, &bytes)?;
                    self.stats.downloads += 1;
                    debug!(%key, attempt, "downloaded tile");
                    return Ok(tile);
                }
                Err(e) => {
                    self.stats.failed_attempts += 1;
                    warn!(%key, attempt, max = self.max_attempts, error = %e, "tile fetch failed");
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        thread::sleep(self.backoff_base * attempt);
                    }
                }
            }
        }

        Err(TileError::Exhausted {
            key,
            attempts: self.max_attempts,
            last: Box::new(last_error.unwrap_or(TileError::Decode("no attempts made".to_string()))),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tiles::decode::tests::encode_tile;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Source that fails the first `failures` calls, then serves a flat tile.
    pub(crate) struct FlakySource {
        pub failures: usize,
        pub calls: Rc<Cell<usize>>,
        pub meters: f32,
    }

    impl TileSource for FlakySource {
        fn fetch(&self, key: TileKey) -> Result<Vec<u8>, TileError> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n < self.failures {
                return Err(TileError::Status { key, status: 503 });
            }
            let meters = self.meters;
            Ok(encode_tile(16, move |_, _| meters))
        }
    }

    fn flaky(failures: usize) -> (Box<dyn TileSource>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let source = FlakySource { failures, calls: calls.clone(), meters: 812.0 };
        (Box::new(source), calls)
    }

    #[test]
    fn test_download_then_disk_then_memory() {
        let dir = tempdir().unwrap();
        let key = TileKey::new(10, 163, 357);
        let cancel = CancelToken::new();

        let (source, calls) = flaky(0);
        let mut cache = TileCache::new(dir.path(), source, 4, Duration::ZERO);
        assert_eq!(cache.tile(key, &cancel).unwrap().elevation_at(5, 5), 812.0);
        assert!(cache.tile_path(key).is_file());
        cache.tile(key, &cancel).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.stats().memory_hits, 1);

        // A fresh cache over the same root never touches the source
        let (source, calls) = flaky(0);
        let mut cache = TileCache::new(dir.path(), source, 4, Duration::ZERO);
        cache.tile(key, &cancel).unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(cache.stats().disk_hits, 1);
    }

    #[test]
    fn test_begin_run_drops_memory() {
        let dir = tempdir().unwrap();
        let key = TileKey::new(9, 81, 178);
        let cancel = CancelToken::new();
        let (source, calls) = flaky(0);
        let mut cache = TileCache::new(dir.path(), source, 1, Duration::ZERO);
        cache.tile(key, &cancel).unwrap();
        cache.tile(key, &cancel).unwrap();
        assert_eq!(cache.stats().memory_hits, 1);

        cache.begin_run();
        assert_eq!(cache.stats(), CacheStats::default());
        cache.tile(key, &cancel).unwrap();
        assert_eq!(cache.stats().memory_hits, 0);
        assert_eq!(cache.stats().disk_hits, 1);

        // With the disk copy gone too, the next run goes back to the source
        fs::remove_dir_all(dir.path().join("tiles")).unwrap();
        cache.begin_run();
        cache.tile(key, &cancel).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.stats().downloads, 1);
    }

    #[test]
    fn test_retries_until_success() {
        let dir = tempdir().unwrap();
        let (source, calls) = flaky(3);
        let mut cache = TileCache::new(dir.path(), source, 4, Duration::ZERO);
        cache.tile(TileKey::new(3, 1, 1), &CancelToken::new()).unwrap();
        assert_eq!(calls.get(), 4);
        assert_eq!(cache.stats().failed_attempts, 3);
    }

    #[test]
    fn test_exhausted_attempts_is_error() {
        let dir = tempdir().unwrap();
        let key = TileKey::new(3, 1, 1);
        let (source, calls) = flaky(10);
        let mut cache = TileCache::new(dir.path(), source, 4, Duration::ZERO);
        let err = cache.tile(key, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, TileError::Exhausted { attempts: 4, .. }));
        assert_eq!(calls.get(), 4);
        assert!(!cache.tile_path(key).exists());
    }

    #[test]
    fn test_cancelled_before_request() {
        let dir = tempdir().unwrap();
        let (source, calls) = flaky(0);
        let mut cache = TileCache::new(dir.path(), source, 4, Duration::ZERO);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = cache.tile(TileKey::new(3, 1, 1), &cancel).unwrap_err();
        assert!(matches!(err, TileError::Cancelled));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_corrupt_disk_tile_is_refetched() {
        let dir = tempdir().unwrap();
        let key = TileKey::new(5, 2, 9);
        let (source, calls) = flaky(0);
        let mut cache = TileCache::new(dir.path(), source, 2, Duration::ZERO);
        let path = cache.tile_path(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"truncated").unwrap();

        cache.tile(key, &CancelToken::new()).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(decode_terrarium(&fs::read(&path).unwrap()).is_ok());
    }

    #[test]
    fn test_sample_dedupes_tiles() {
        let dir = tempdir().unwrap();
        let (source, calls) = flaky(0);
        let mut cache = TileCache::new(dir.path(), source, 1, Duration::ZERO);
        let points = [(47.60, -122.33), (47.601, -122.331), (47.602, -122.332)];
        let values = cache.sample(&points, 8, &CancelToken::new()).unwrap();
        assert_eq!(values, vec![812.0; 3]);
        assert_eq!(calls.get(), 1);
    }
}
