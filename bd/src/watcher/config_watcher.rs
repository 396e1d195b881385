//! Configuration file watcher implementation

use std::path::PathBuf;
use std::time::SystemTime;

use eyre::{Result, eyre};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::WatcherConfig;

/// Sent when the configuration file changed and should be reloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub modified: SystemTime,
}

/// The ConfigWatcher polls a file's mtime and requests a reload on change
pub struct ConfigWatcher {
    config: WatcherConfig,
    path: PathBuf,
    reload_tx: mpsc::Sender<ReloadRequest>,
    last_modified: Option<SystemTime>,
    missing_reported: bool,
}

impl ConfigWatcher {
    pub fn new(config: WatcherConfig, path: impl Into<PathBuf>, reload_tx: mpsc::Sender<ReloadRequest>) -> Self {
        Self {
            config,
            path: path.into(),
            reload_tx,
            last_modified: None,
            missing_reported: false,
        }
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Run a single check; returns true when a reload was requested
    ///
    /// The first successful observation always requests a reload, which is
    /// how the initial configuration gets loaded.
    pub async fn check_once(&mut self) -> Result<bool> {
        let modified = match tokio::fs::metadata(&self.path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                if self.missing_reported {
                    debug!(path = %self.path.display(), "Configuration file still missing");
                } else {
                    warn!(path = %self.path.display(), error = %e, "Configuration file is not readable");
                    self.missing_reported = true;
                }
                // Reappearing file counts as a change
                self.last_modified = None;
                return Ok(false);
            }
        };
        self.missing_reported = false;

        if self.last_modified == Some(modified) {
            debug!(path = %self.path.display(), "Configuration unchanged");
            return Ok(false);
        }

        info!(path = %self.path.display(), "Configuration changed, requesting reload");
        self.reload_tx
            .send(ReloadRequest { modified })
            .await
            .map_err(|_| eyre!("Reload channel closed"))?;
        self.last_modified = Some(modified);
        Ok(true)
    }

    /// Run the watcher loop
    ///
    /// This runs until the reload channel is closed.
    pub async fn run(mut self) -> Result<()> {
        info!(
            path = %self.path.display(),
            interval_secs = self.config.poll_interval().as_secs(),
            "ConfigWatcher started"
        );

        loop {
            if self.check_once().await.is_err() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
                _ = self.reload_tx.closed() => break,
            }
        }

        info!("ConfigWatcher stopped");
        Ok(())
    }
}
