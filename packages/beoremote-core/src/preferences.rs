//! Default-device preference storage.
//!
//! The core only reads the default device name, except that a successful
//! manual connection records it when "remember last connected" is enabled.

use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol_constants::PREFERENCES_FILE;

/// Errors raised while persisting preferences.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenient Result alias for preference operations.
pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Access to the persisted default-device preference.
pub trait PreferenceStore: Send + Sync {
    /// Display name of the preferred device, if one is configured.
    fn default_device_name(&self) -> Option<String>;

    /// Records a new preferred device.
    fn set_default_device_name(&self, name: &str) -> PreferenceResult<()>;
}

/// Persisted preference document.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_device: Option<String>,
}

/// In-memory store for runs without a data directory.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    default_device: RwLock<Option<String>>,
}

impl MemoryPreferenceStore {
    pub fn new(default_device: Option<String>) -> Self {
        Self {
            default_device: RwLock::new(default_device),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn default_device_name(&self) -> Option<String> {
        self.default_device.read().clone()
    }

    fn set_default_device_name(&self, name: &str) -> PreferenceResult<()> {
        *self.default_device.write() = Some(name.to_string());
        Ok(())
    }
}

/// JSON-file store inside the application data directory.
///
/// Reads are served from memory; writes go to a temp file that is then
/// renamed over the real one.
#[derive(Debug)]
pub struct FilePreferenceStore {
    dir: PathBuf,
    current: RwLock<Preferences>,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    /// Opens the store, loading existing preferences from `dir`.
    ///
    /// A missing or unreadable file yields default preferences.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let current = Self::load(&dir);
        Self {
            dir,
            current: RwLock::new(current),
            write_lock: Mutex::new(()),
        }
    }

    fn load(dir: &Path) -> Preferences {
        let path = dir.join(PREFERENCES_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!(
                    "[Preferences] Ignoring malformed {}: {}",
                    path.display(),
                    e
                );
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        }
    }

    fn save(&self, preferences: &Preferences) -> PreferenceResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(PREFERENCES_FILE);
        let temp_path = self.dir.join(format!("{}.tmp", PREFERENCES_FILE));
        let contents = serde_json::to_string_pretty(preferences)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PREFERENCES_FILE)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn default_device_name(&self) -> Option<String> {
        self.current.read().default_device.clone()
    }

    fn set_default_device_name(&self, name: &str) -> PreferenceResult<()> {
        let _guard = self.write_lock.lock();
        let mut updated = self.current.read().clone();
        if updated.default_device.as_deref() == Some(name) {
            return Ok(());
        }
        updated.default_device = Some(name.to_string());
        self.save(&updated)?;
        *self.current.write() = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_default() {
        let store = MemoryPreferenceStore::new(None);
        assert_eq!(store.default_device_name(), None);
        store.set_default_device_name("Living Room").unwrap();
        assert_eq!(store.default_device_name().as_deref(), Some("Living Room"));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::open(dir.path());
        assert_eq!(store.default_device_name(), None);

        store.set_default_device_name("Kitchen").unwrap();
        assert!(store.path().exists());

        let reopened = FilePreferenceStore::open(dir.path());
        assert_eq!(reopened.default_device_name().as_deref(), Some("Kitchen"));
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("beoremote");
        let store = FilePreferenceStore::open(&nested);
        store.set_default_device_name("Den").unwrap();
        assert!(nested.join(PREFERENCES_FILE).exists());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PREFERENCES_FILE), "{not json").unwrap();
        let store = FilePreferenceStore::open(dir.path());
        assert_eq!(store.default_device_name(), None);
    }

    #[test]
    fn preferences_use_camel_case_keys() {
        let prefs = Preferences {
            default_device: Some("Office".to_string()),
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(json, r#"{"defaultDevice":"Office"}"#);
    }
}
