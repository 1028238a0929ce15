use crate::error::{Result, ShelveError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

const HISTORY_ENV: &str = "SHELVE_HISTORY";

pub struct Config {
    pub history_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub settings: Settings,
}

/// Optional `shelve.toml` in the XDG config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Seconds between daemon runs.
    pub interval: u64,
    pub interactive: bool,
    /// Used instead of the OS trash when set.
    pub trash_dir: Option<PathBuf>,
    pub simulate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: 60,
            interactive: true,
            trash_dir: None,
            simulate: false,
        }
    }
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShelveError::Config(format!("Failed to read settings file {}: {}", path.display(), e))
        })?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| ShelveError::Config(format!("Failed to parse settings TOML: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ShelveError::Config(
                "interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn new(history_override: Option<PathBuf>) -> Result<Self> {
        let history_path = if let Some(path) = history_override {
            path
        } else if let Ok(env_path) = std::env::var(HISTORY_ENV) {
            PathBuf::from(env_path)
        } else {
            let xdg = BaseDirectories::with_prefix("shelve").map_err(|e| {
                ShelveError::Config(format!("Failed to initialize XDG directories: {}", e))
            })?;
            xdg.place_data_file("history.txt")
                .map_err(|e| ShelveError::Config(format!("Failed to create data directory: {}", e)))?
        };

        let settings_path = BaseDirectories::with_prefix("shelve")
            .ok()
            .and_then(|xdg| xdg.find_config_file("shelve.toml"));

        let settings = match &settings_path {
            Some(path) => Settings::load_from_file(path)?,
            None => Settings::default(),
        };

        Ok(Self {
            history_path,
            settings_path,
            settings,
        })
    }

    pub fn ensure_history_directory(&self) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
