use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{RelayError, Result};
use crate::presence::ActivitySettings;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub share_server_activity: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            share_server_activity: true,
        }
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| RelayError::Settings("Failed to get config directory".to_string()))?
        .join("rich-presence-relay");

    fs::create_dir_all(&config_dir).map_err(|e| {
        RelayError::Settings(format!("Failed to create config directory: {}", e))
    })?;

    Ok(config_dir.join(SETTINGS_FILE))
}

pub fn load_settings(path: &Path) -> Result<AppSettings> {
    tracing::debug!("Loading settings");

    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    tracing::debug!("Saving settings");

    let contents = serde_json::to_string_pretty(settings)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Settings file plus an in-memory copy the update loop can read cheaply
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = load_settings(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(settings),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_settings_path()?)
    }

    pub fn get(&self) -> AppSettings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_share_server_activity(&self, share: bool) -> Result<AppSettings> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut settings = current.clone();
        settings.share_server_activity = share;
        save_settings(&self.path, &settings)?;
        *current = settings.clone();
        Ok(settings)
    }
}

impl ActivitySettings for SettingsStore {
    fn share_server_activity(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .share_server_activity
    }
}
