//! backupd settings types and loading
//!
//! These are the daemon's own settings (logging, file locations, copy command).
//! The backup task list lives in the separate configuration document that the
//! daemon watches and reloads.

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::executor::CopyConfig;
use crate::status::DEFAULT_CHANNEL_CAPACITY;
use crate::watcher::WatcherConfig;

/// Main backupd settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level used when none is given on the command line
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Directory for the log file
    #[serde(rename = "log-dir")]
    pub log_dir: Option<PathBuf>,

    /// Configuration and status file locations
    pub paths: PathsConfig,

    /// Configuration file polling
    pub watcher: WatcherConfig,

    /// External copy command
    pub copy: CopyConfig,

    /// Status recorder
    pub status: StatusConfig,
}

impl Settings {
    /// Load settings with fallback chain
    pub fn load(settings_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit settings path provided, try to load it
        if let Some(path) = settings_path {
            return Self::load_from_file(path).context(format!("Failed to load settings from {}", path.display()));
        }

        // Try project-local settings: .backupd.yml
        let local_settings = PathBuf::from(".backupd.yml");
        if local_settings.exists() {
            match Self::load_from_file(&local_settings) {
                Ok(settings) => return Ok(settings),
                Err(e) => {
                    tracing::warn!("Failed to load settings from {}: {}", local_settings.display(), e);
                }
            }
        }

        // Try user settings: ~/.config/backupd/backupd.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_settings = config_dir.join("backupd").join("backupd.yml");
            if user_settings.exists() {
                match Self::load_from_file(&user_settings) {
                    Ok(settings) => return Ok(settings),
                    Err(e) => {
                        tracing::warn!("Failed to load settings from {}: {}", user_settings.display(), e);
                    }
                }
            }
        }

        // No settings file found, use defaults
        tracing::info!("No settings file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read settings file")?;

        let settings: Self = serde_yaml::from_str(&content).context("Failed to parse settings file")?;

        tracing::info!("Loaded settings from: {}", path.as_ref().display());
        Ok(settings)
    }

    /// Directory for the log file: settings value, else the user data dir
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("backupd").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}

/// Locations of the watched configuration document and the status file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Backup configuration document
    #[serde(rename = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Persisted run status
    #[serde(rename = "status-file")]
    pub status_file: Option<PathBuf>,
}

impl PathsConfig {
    /// Resolve both paths; explicit arguments win over settings
    ///
    /// Unset paths default to `<documents>/backup/`. Failing to locate the
    /// user's documents directory is fatal.
    pub fn resolve(&self, config_file: Option<&PathBuf>, status_file: Option<&PathBuf>) -> Result<(PathBuf, PathBuf)> {
        let config = config_file.or(self.config_file.as_ref()).cloned();
        let status = status_file.or(self.status_file.as_ref()).cloned();

        if let (Some(config), Some(status)) = (&config, &status) {
            return Ok((config.clone(), status.clone()));
        }

        let backup_dir = default_backup_dir()?;
        Ok((
            config.unwrap_or_else(|| backup_dir.join("backup.yaml")),
            status.unwrap_or_else(|| backup_dir.join("backup_status.yaml")),
        ))
    }
}

fn default_backup_dir() -> Result<PathBuf> {
    let documents = dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .ok_or_else(|| eyre!("Could not determine the user's documents directory"))?;
    Ok(documents.join("backup"))
}

/// Status recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Capacity of the recorder's command channel
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
