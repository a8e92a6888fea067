// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Library settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned for music; nothing is scanned when unset
    pub root: Option<PathBuf>,
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub volume: f32, // 0.0-1.0
    pub level_poll_ms: u64,
    pub auto_advance: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            level_poll_ms: 50,
            auto_advance: true,
        }
    }
}

impl PlaybackSettings {
    /// Polling period for the level meter, never below 10ms
    pub fn level_interval(&self) -> Duration {
        Duration::from_millis(self.level_poll_ms.max(10))
    }
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            library: LibrarySettings::default(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join(SETTINGS_FILE)
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            tracing::info!(path = %path.display(), "No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|source| SettingsError::Read { path: path.clone(), source })?;

        let mut settings: AppSettings = serde_json::from_str(&content)?;
        settings.playback.volume = settings.playback.volume.clamp(0.0, 1.0);

        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<(), SettingsError> {
        let path = Self::get_settings_path(app_dir);

        fs::create_dir_all(app_dir)
            .map_err(|source| SettingsError::Write { path: path.clone(), source })?;

        let content = serde_json::to_string_pretty(self)?;

        fs::write(&path, content)
            .map_err(|source| SettingsError::Write { path: path.clone(), source })?;

        tracing::info!(path = %path.display(), "Saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::load(dir.path()).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(settings.playback.auto_advance);
        assert_eq!(settings.library.root, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("nested").join("app");

        let mut settings = AppSettings::default();
        settings.library.root = Some(PathBuf::from("/srv/music"));
        settings.playback.volume = 0.4;
        settings.playback.auto_advance = false;
        settings.save(&app_dir).unwrap();

        assert_eq!(AppSettings::load(&app_dir).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            AppSettings::get_settings_path(dir.path()),
            r#"{ "playback": { "volume": 7.5 } }"#,
        )
        .unwrap();

        let settings = AppSettings::load(dir.path()).unwrap();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.playback.volume, 1.0);
        assert_eq!(settings.playback.level_poll_ms, 50);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(AppSettings::get_settings_path(dir.path()), "{ not json").unwrap();
        assert!(matches!(AppSettings::load(dir.path()), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_level_interval_floor() {
        let playback = PlaybackSettings { level_poll_ms: 1, ..Default::default() };
        assert_eq!(playback.level_interval(), Duration::from_millis(10));
    }
}
