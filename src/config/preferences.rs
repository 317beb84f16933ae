//! Preference storage collaborator.
//!
//! The coordinator reads [`Preferences`] at the start of every session and
//! writes back the speed after a successful change.  It never caches them:
//! a reloaded coordinator sees the same values.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::{AppConfig, AppPaths, Preferences};

/// Durable home of the user's voice, speed and highlighting choices.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Preferences>;
    fn store(&self, preferences: &Preferences) -> Result<()>;
}

// ---------------------------------------------------------------------------
// FilePreferenceStore
// ---------------------------------------------------------------------------

/// Keeps preferences in the `[preferences]` section of `settings.toml`,
/// leaving every other section untouched.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by the platform `settings.toml`.
    pub fn from_app_paths(paths: &AppPaths) -> Self {
        Self::new(paths.settings_file.clone())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Preferences> {
        Ok(AppConfig::load_from(&self.path)?.preferences)
    }

    fn store(&self, preferences: &Preferences) -> Result<()> {
        let mut config = AppConfig::load_from(&self.path)?;
        config.preferences = preferences.clone();
        config.save_to(&self.path)
    }
}

// ---------------------------------------------------------------------------
// MemoryPreferenceStore
// ---------------------------------------------------------------------------

/// Process-local store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            preferences: Mutex::new(preferences),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        self.preferences
            .lock()
            .map(|p| p.clone())
            .map_err(|_| anyhow!("preference store lock poisoned"))
    }

    fn store(&self, preferences: &Preferences) -> Result<()> {
        let mut guard = self
            .preferences
            .lock()
            .map_err(|_| anyhow!("preference store lock poisoned"))?;
        *guard = preferences.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_preserves_other_sections() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut config = AppConfig::default();
        config.playback.progress_interval_ms = 40;
        config.save_to(&path).expect("save");

        let store = FilePreferenceStore::new(&path);
        let mut prefs = store.load().expect("load");
        prefs.speed = 1.5;
        store.store(&prefs).expect("store");

        let reloaded = AppConfig::load_from(&path).expect("reload");
        assert!((reloaded.preferences.speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(reloaded.playback.progress_interval_ms, 40);
    }

    #[test]
    fn file_store_without_file_yields_defaults() {
        let dir = tempdir().expect("temp dir");
        let store = FilePreferenceStore::new(dir.path().join("missing.toml"));
        assert_eq!(store.load().expect("load"), Preferences::default());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryPreferenceStore::default();
        let prefs = Preferences {
            voice_id: "v2".into(),
            speed: 0.75,
            highlighting_enabled: false,
        };
        store.store(&prefs).expect("store");
        assert_eq!(store.load().expect("load"), prefs);
    }
}
