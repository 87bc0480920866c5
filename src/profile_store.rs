//! Loads calibration profiles from `<profile_dir>/<id>.json`.
//!
//! A missing or unreadable profile is an ordinary outcome: `load` returns
//! `None` and the caller falls back to [`Profile::default_profile`]. Every
//! profile that comes out of the store has been normalized.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config;
use crate::profile::{Profile, ProfileError};

/// Read-mostly view of a profile directory.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    dir: PathBuf,
}

/// IDs are file stems. Reject anything that could escape the directory.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

impl ProfileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Store rooted at `TOPOGEN_PROFILE_DIR`, or the default assets path.
    pub fn from_env() -> Self {
        Self::new(config::profile_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a profile with this ID would live at.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn exists(&self, id: &str) -> bool {
        is_valid_id(id) && self.path_for(id).is_file()
    }

    /// Load and normalize a profile. `None` if the ID is invalid, the file is
    /// missing, or its contents do not parse.
    pub fn load(&self, id: &str) -> Option<Profile> {
        if !is_valid_id(id) {
            warn!(id, "rejecting invalid profile id");
            return None;
        }

        let path = self.path_for(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "profile not found");
                return None;
            }
        };

        let mut profile: Profile = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed profile, ignoring");
                return None;
            }
        };

        if !profile.is_valid() {
            warn!(id, "profile out of range, repairing");
        }
        profile.normalize();
        Some(profile)
    }

    /// `load`, falling back to the built-in default.
    pub fn load_or_default(&self, id: &str) -> Profile {
        self.load(id).unwrap_or_else(Profile::default_profile)
    }

    /// Write a profile to `<dir>/<profile.id>.json`.
    pub fn save(&self, profile: &Profile) -> Result<PathBuf, ProfileError> {
        if !is_valid_id(&profile.id) {
            return Err(ProfileError::InvalidId(profile.id.clone()));
        }
        let path = self.path_for(&profile.id);
        profile.save_to(&path)?;
        Ok(path)
    }

    /// IDs of every `*.json` file in the directory, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_profile_is_none() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(store.load("nowhere").is_none());
        assert!(!store.exists("nowhere"));
        assert_eq!(store.load_or_default("nowhere"), Profile::default_profile());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let mut profile = Profile::default_profile();
        profile.id = "olympic_peninsula".to_string();
        profile.name = "Olympic Peninsula".to_string();
        profile.river_density = 0.07;
        store.save(&profile).unwrap();

        assert!(store.exists("olympic_peninsula"));
        let loaded = store.load("olympic_peninsula").unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(store.list_ids(), vec!["olympic_peninsula".to_string()]);
    }

    #[test]
    fn test_malformed_json_is_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(store.load("broken").is_none());
    }

    #[test]
    fn test_hand_edited_profile_is_repaired() {
        let dir = tempdir().unwrap();
        let json = r#"{
            "id": "edited", "name": "Edited", "cell_meters": 100,
            "elev_p10": 30, "elev_p50": 10, "elev_p90": 10,
            "slope_p50": 12, "slope_p90": 4,
            "ruggedness": 7.5, "river_density": 0.9, "lake_coverage": -1
        }"#;
        fs::write(dir.path().join("edited.json"), json).unwrap();

        let loaded = ProfileStore::new(dir.path()).load("edited").unwrap();
        assert!(loaded.is_valid());
        assert_eq!(loaded.elev_p10, 10.0);
        assert_eq!(loaded.elev_p50, 11.0);
        assert_eq!(loaded.elev_p90, 30.0);
        assert!(loaded.slope_p50 < loaded.slope_p90);
        assert_eq!(loaded.ruggedness, 3.0);
        assert_eq!(loaded.river_density, 0.35);
        assert_eq!(loaded.lake_coverage, 0.0);
        assert!(loaded.notes.is_none());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        fs::write(dir.path().join("secret.json"), serde_json::to_string(&Profile::default()).unwrap()).unwrap();
        assert!(store.load("../secret").is_none());

        let mut bad = Profile::default_profile();
        bad.id = "a/b".to_string();
        assert!(matches!(store.save(&bad), Err(ProfileError::InvalidId(_))));
    }
}
