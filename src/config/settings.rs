//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to each
//! context at startup.  Every section is `#[serde(default)]`, so a partial
//! `settings.toml` only overrides what it names.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for the playback context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Cadence of progress ticks while playing (100 ms ≈ 10 Hz).
    pub progress_interval_ms: u64,
    /// Upper bound on any cross-context request before it counts as a
    /// delivery failure.
    pub request_timeout_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            request_timeout_ms: 2_000,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Envelope acceptance window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Envelopes older than this are logged and dropped.
    pub stale_after_ms: u64,
    /// Envelopes stamped further ahead of the receiver clock than this are
    /// logged and dropped.
    pub future_tolerance_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: 5_000,
            future_tolerance_ms: 1_000,
        }
    }
}

// ---------------------------------------------------------------------------
// PanelConfig
// ---------------------------------------------------------------------------

/// Floating control panel behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Optimistic state that is not confirmed within this window reverts.
    pub confirm_timeout_ms: u64,
    /// Lifetime of a transient error notice.
    pub notice_ttl_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_ms: 3_000,
            notice_ttl_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// HighlightConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Scroll the active sentence into view when it is off-screen.
    pub auto_scroll: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { auto_scroll: true }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the network text-to-speech service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Base URL of the API endpoint.
    pub base_url: String,
    /// API key sent as `xi-api-key`.  `None` makes every request fail with
    /// an authentication error.
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
    /// Maximum seconds to wait for synthesized audio.
    pub timeout_secs: u64,
    /// Number of synthesized clips kept in memory.  `0` disables caching.
    pub cache_entries: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".into(),
            api_key: None,
            model: "eleven_multilingual_v2".into(),
            timeout_secs: 30,
            cache_entries: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// User preferences read at the start of every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Voice identifier passed to the speech service.
    pub voice_id: String,
    /// Playback rate, 0.5 – 2.0.
    pub speed: f32,
    /// Highlight sentences while audio plays.
    pub highlighting_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            speed: 1.0,
            highlighting_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use readalong::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Playback context cadence and request bounds.
    pub playback: PlaybackConfig,
    /// Envelope freshness window.
    pub sync: SyncConfig,
    /// Control panel timing.
    pub panel: PanelConfig,
    /// Highlight engine behaviour.
    pub highlight: HighlightConfig,
    /// Network speech service.
    pub tts: TtsConfig,
    /// Voice, speed and highlighting preferences.
    pub preferences: Preferences,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = AppConfig::default();
        original.tts.api_key = Some("sk-test".into());
        original.preferences.speed = 1.25;
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[playback]\nprogress_interval_ms = 50\n\n[preferences]\nhighlighting_enabled = false\n",
        )
        .expect("write");

        let config = AppConfig::load_from(&path).expect("load");
        assert_eq!(config.playback.progress_interval_ms, 50);
        assert_eq!(config.playback.request_timeout_ms, 2_000);
        assert!(!config.preferences.highlighting_enabled);
        assert_eq!(config.preferences.voice_id, Preferences::default().voice_id);
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.playback.progress_interval_ms, 100);
        assert_eq!(config.sync.stale_after_ms, 5_000);
        assert_eq!(config.panel.confirm_timeout_ms, 3_000);
        assert_eq!(config.tts.timeout_secs, 30);
        assert_eq!(config.tts.cache_entries, 8);
        assert!((config.preferences.speed - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[playback\n").expect("write");
        assert!(AppConfig::load_from(&path).is_err());
    }
}
