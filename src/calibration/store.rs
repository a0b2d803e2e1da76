// JsonProfileStore - on-disk persistence for the calibration profile
//
// The engine keeps the profile in memory only; callers that want it to
// survive a restart save it here after `on_complete` and load it back with
// `EngineHandle::load_calibration`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::calibration::CalibrationProfile;

/// Calibration profile stored as a single JSON document
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored profile.
    ///
    /// # Returns
    /// * `Ok(Some(profile))` - Profile read from disk
    /// * `Ok(None)` - No profile has been saved yet
    /// * `Err(_)` - File exists but could not be read or parsed
    pub fn load(&self) -> anyhow::Result<Option<CalibrationProfile>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading calibration profile {:?}", self.path))?;
        let profile = serde_json::from_str(&contents)
            .with_context(|| format!("parsing calibration profile {:?}", self.path))?;

        log::info!("[JsonProfileStore] Loaded calibration from {:?}", self.path);
        Ok(Some(profile))
    }

    /// Write the profile, creating parent directories as needed
    pub fn save(&self, profile: &CalibrationProfile) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {:?}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing calibration profile {:?}", self.path))?;

        log::info!("[JsonProfileStore] Saved calibration to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::new(dir.path().join("calibration.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_saved_profile_is_loaded_back() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::new(dir.path().join("nested").join("calibration.json"));
        let profile = CalibrationProfile::new(4.0, 95.0, 1_700_000_000);

        store.save(&profile).unwrap();

        assert_eq!(store.load().unwrap(), Some(profile));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonProfileStore::new(&path).load().is_err());
    }
}
