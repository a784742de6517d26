/*
 * Manages persisted application settings: the path of the last opened tree
 * file and whether that path should be remembered across sessions at all.
 * Settings live in a small JSON file inside the per-user settings directory
 * resolved by `path_utils`.
 *
 * A trait (`SettingsStoreOperations`) fronts the concrete file-backed store
 * so application logic tests can substitute an in-memory implementation.
 */
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoSettingsDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Settings I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Settings serialization error: {e}"),
            ConfigError::NoSettingsDirectory => {
                write!(f, "Could not determine settings directory")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            ConfigError::NoSettingsDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_remember_last_path() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_path: Option<PathBuf>,
    /// When false, the last opened path is neither stored nor restored.
    #[serde(default = "default_remember_last_path")]
    pub remember_last_path: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            last_opened_path: None,
            remember_last_path: true,
        }
    }
}

pub trait SettingsStoreOperations: Send + Sync {
    fn load_settings(&self, app_name: &str) -> Result<AppSettings>;
    fn save_settings(&self, app_name: &str, settings: &AppSettings) -> Result<()>;
}

pub struct CoreSettingsStore {}

impl CoreSettingsStore {
    pub fn new() -> Self {
        CoreSettingsStore {}
    }

    fn settings_file_path(app_name: &str) -> Result<PathBuf> {
        let dir =
            path_utils::get_app_settings_dir(app_name).ok_or(ConfigError::NoSettingsDirectory)?;
        Ok(dir.join(SETTINGS_FILENAME))
    }
}

impl Default for CoreSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStoreOperations for CoreSettingsStore {
    /*
     * Loads the settings for `app_name`. A missing settings file is not an
     * error; it simply yields the defaults (first run).
     */
    fn load_settings(&self, app_name: &str) -> Result<AppSettings> {
        log::trace!("CoreSettingsStore: Loading settings for app '{app_name}'");
        let file_path = Self::settings_file_path(app_name)?;

        if !file_path.exists() {
            log::debug!("CoreSettingsStore: Settings file {file_path:?} does not exist.");
            return Ok(AppSettings::default());
        }

        let content = fs::read_to_string(&file_path)?;
        let settings: AppSettings = serde_json::from_str(&content)?;
        log::debug!("CoreSettingsStore: Loaded settings from {file_path:?}: {settings:?}");
        Ok(settings)
    }

    fn save_settings(&self, app_name: &str, settings: &AppSettings) -> Result<()> {
        log::trace!("CoreSettingsStore: Saving settings for app '{app_name}': {settings:?}");
        let file_path = Self::settings_file_path(app_name)?;
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&file_path, json)?;
        log::debug!("CoreSettingsStore: Saved settings to {file_path:?}.");
        Ok(())
    }
}
