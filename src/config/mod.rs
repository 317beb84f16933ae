//! Configuration module for readalong.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per context,
//! `AppPaths` for the platform config directory, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and the `PreferenceStore`
//! collaborator the coordinator reads at session start.

pub mod paths;
pub mod preferences;
pub mod settings;

pub use paths::AppPaths;
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use settings::{
    AppConfig, HighlightConfig, PanelConfig, PlaybackConfig, Preferences, SyncConfig, TtsConfig,
};
