//! ConfigStore - loads the backup configuration and persists run status
//!
//! The configuration document is re-read and validated on every reload. History
//! from the status file is merged into the fresh snapshot by task identity.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{ConfigDocument, Snapshot, StatusDocument};
use crate::domain::MAX_PERIOD;
use crate::duration::{DurationError, format_duration};

/// Errors from loading, validating or persisting documents
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },

    #[error("task {task}: {field} is not set and no default is configured")]
    MissingField { task: String, field: &'static str },

    #[error("task {task}: invalid period {value:?}: {source}")]
    InvalidPeriod {
        task: String,
        value: String,
        source: DurationError,
    },

    #[error("task {task}: period must be greater than zero")]
    ZeroPeriod { task: String },

    #[error("task {task}: period {value:?} is longer than {max}", max = format_duration(MAX_PERIOD))]
    PeriodTooLarge { task: String, value: String },

    #[error("task {key} is configured more than once")]
    DuplicateTask { key: String },

    #[error("failed to serialize status: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("failed to write status {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

/// Owns the configuration and status file locations
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
    status_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_path: impl Into<PathBuf>, status_path: impl Into<PathBuf>) -> Self {
        let store = Self {
            config_path: config_path.into(),
            status_path: status_path.into(),
        };
        debug!(config = %store.config_path.display(), status = %store.status_path.display(), "ConfigStore::new");
        store
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Modification time of the configuration file
    pub fn modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.config_path)?.modified()
    }

    /// Read and parse the configuration document without validating it
    pub fn read_document(&self) -> Result<ConfigDocument, ConfigError> {
        read_yaml(&self.config_path)
    }

    /// Load, validate and merge persisted history into a new snapshot
    pub fn load(&self) -> Result<Snapshot, ConfigError> {
        debug!(path = %self.config_path.display(), "ConfigStore::load: called");
        let mut snapshot = self.read_document()?.validate()?;

        match self.read_status() {
            Ok(Some(status)) => {
                let merged = snapshot.merge_status(&status);
                debug!(merged, "ConfigStore::load: merged persisted history");
            }
            Ok(None) => {
                debug!("ConfigStore::load: no status file yet");
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable status file, history starts empty");
            }
        }

        info!(
            tasks = snapshot.tasks.len(),
            path = %self.config_path.display(),
            "Loaded backup configuration"
        );
        Ok(snapshot)
    }

    /// Read the status document, `None` if it does not exist yet
    pub fn read_status(&self) -> Result<Option<StatusDocument>, ConfigError> {
        if !self.status_path.exists() {
            return Ok(None);
        }
        read_yaml(&self.status_path).map(Some)
    }

    /// Write the status document atomically (temp file, then rename)
    pub fn persist_status(&self, status: &StatusDocument) -> Result<(), ConfigError> {
        debug!(tasks = status.tasks.len(), "ConfigStore::persist_status: called");
        let yaml = serde_yaml::to_string(status)?;

        let persist_err = |source| ConfigError::Persist {
            path: self.status_path.clone(),
            source,
        };

        if let Some(parent) = self.status_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }

        let tmp_path = self.status_path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml).map_err(persist_err)?;
        fs::rename(&tmp_path, &self.status_path).map_err(persist_err)?;
        Ok(())
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
