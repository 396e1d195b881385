//! Daemon wiring
//!
//! Starts the status recorder, the configuration watcher and the supervisor,
//! and tears them down in order on shutdown: schedulers first, then the
//! watcher, then a final status write.

use std::sync::Arc;

use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::executor::{CommandExecutor, CopyExecutor};
use crate::runner::TaskRunner;
use crate::status::StatusRecorder;
use crate::store::ConfigStore;
use crate::supervisor::Supervisor;
use crate::watcher::ConfigWatcher;

/// Pending reload requests kept before the watcher waits
const RELOAD_CHANNEL_CAPACITY: usize = 8;

pub struct Daemon {
    settings: Settings,
    store: Arc<ConfigStore>,
    executor: Arc<dyn CopyExecutor>,
}

impl Daemon {
    /// Daemon that copies with the program from `settings`
    pub fn new(settings: Settings, store: ConfigStore) -> Self {
        let executor = Arc::new(CommandExecutor::from_config(&settings.copy));
        Self::with_executor(settings, store, executor)
    }

    pub fn with_executor(settings: Settings, store: ConfigStore, executor: Arc<dyn CopyExecutor>) -> Self {
        debug!(config = %store.config_path().display(), "Daemon::with_executor: called");
        Self {
            settings,
            store: Arc::new(store),
            executor,
        }
    }

    /// Run until a message arrives on `shutdown_rx` (or its sender is dropped)
    pub async fn run(self, shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(
            config = %self.store.config_path().display(),
            status = %self.store.status_path().display(),
            program = %self.settings.copy.program,
            "backupd starting"
        );

        let (recorder, recorder_handle) =
            StatusRecorder::spawn(self.store.clone(), self.settings.status.channel_capacity);
        let runner = Arc::new(TaskRunner::from_config(self.executor.clone(), &self.settings.copy));

        let (reload_tx, reload_rx) = mpsc::channel(RELOAD_CHANNEL_CAPACITY);
        let watcher = ConfigWatcher::new(self.settings.watcher.clone(), self.store.config_path(), reload_tx);
        let watcher_handle = tokio::spawn(watcher.run());

        let supervisor = Supervisor::new(self.store.clone(), runner, recorder.clone());
        let result = supervisor.run(reload_rx, shutdown_rx).await;

        // The supervisor dropped its reload receiver, which ends the watcher
        match watcher_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "ConfigWatcher failed"),
            Err(e) => warn!(error = %e, "ConfigWatcher task panicked"),
        }

        if let Err(e) = recorder.shutdown().await {
            warn!(error = %e, "Status recorder already stopped");
        }
        recorder_handle.await.context("Status recorder task failed")?;

        info!("backupd stopped");
        result
    }

    /// Run until Ctrl-C
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
            let _ = shutdown_tx.send(()).await;
        });
        self.run(shutdown_rx).await
    }
}
