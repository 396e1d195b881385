//! Supervisor - reconciles running schedulers with the configuration
//!
//! Every reload replaces the whole scheduler set. Old schedulers are stopped
//! and joined before any replacement starts, so a task identity never has two
//! live schedulers.

use std::sync::Arc;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::{Snapshot, TaskKey};
use crate::runner::TaskRunner;
use crate::scheduler::{SchedulerHandle, TaskScheduler};
use crate::status::StatusRecorder;
use crate::store::{ConfigError, ConfigStore};
use crate::watcher::ReloadRequest;

pub struct Supervisor {
    store: Arc<ConfigStore>,
    runner: Arc<TaskRunner>,
    recorder: StatusRecorder,
    schedulers: Vec<SchedulerHandle>,
    snapshot: Option<Arc<Snapshot>>,
}

impl Supervisor {
    pub fn new(store: Arc<ConfigStore>, runner: Arc<TaskRunner>, recorder: StatusRecorder) -> Self {
        debug!(config = %store.config_path().display(), "Supervisor::new: called");
        Self {
            store,
            runner,
            recorder,
            schedulers: Vec::new(),
            snapshot: None,
        }
    }

    /// The active configuration, if one has been loaded
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Identities of the schedulers that are still running
    pub fn running(&self) -> Vec<TaskKey> {
        self.schedulers
            .iter()
            .filter(|h| !h.is_finished())
            .map(|h| h.key().clone())
            .collect()
    }

    /// Load the configuration and reconcile; keeps the current set on error
    pub async fn reload(&mut self) -> Result<usize, ConfigError> {
        debug!("Supervisor::reload: called");
        match self.store.load() {
            Ok(next) => {
                let count = next.tasks.len();
                self.reconcile(next).await;
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Reload failed, keeping current configuration");
                Err(e)
            }
        }
    }

    /// Replace every running scheduler with one per task in `next`
    pub async fn reconcile(&mut self, mut next: Snapshot) {
        let stopped = self.stop_all().await;

        // Nothing runs now, so the recorder's history is final
        match self.recorder.snapshot().await {
            Ok(status) => {
                next.merge_status(&status);
            }
            Err(e) => warn!(error = %e, "Could not read in-memory history"),
        }
        if let Err(e) = self.recorder.replace(next.status()).await {
            warn!(error = %e, "Could not hand new task set to status recorder");
        }

        let next = Arc::new(next);
        for task in &next.tasks {
            let handle = TaskScheduler::spawn(task.clone(), self.runner.clone(), self.recorder.clone());
            self.schedulers.push(handle);
        }
        self.snapshot = Some(next);

        info!(stopped, started = self.schedulers.len(), "Reconciled task schedulers");
    }

    /// Stop every scheduler and wait for each to terminate
    pub async fn stop_all(&mut self) -> usize {
        debug!(count = self.schedulers.len(), "Supervisor::stop_all: called");
        for handle in &mut self.schedulers {
            handle.stop();
        }

        let handles = std::mem::take(&mut self.schedulers);
        let count = handles.len();
        for handle in handles {
            let name = handle.name().to_string();
            if let Err(e) = handle.join().await {
                error!(task = %name, error = %e, "Scheduler terminated abnormally");
            }
        }
        count
    }

    /// Drive reloads until shutdown, then stop everything and flush status
    ///
    /// Bursts of reload requests collapse into a single reload.
    pub async fn run(
        mut self,
        mut reload_rx: mpsc::Receiver<ReloadRequest>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        info!("Supervisor started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                request = reload_rx.recv() => {
                    let Some(mut request) = request else {
                        info!("Reload channel closed");
                        break;
                    };
                    while let Ok(newer) = reload_rx.try_recv() {
                        request = newer;
                    }
                    debug!(?request, "Reload requested");
                    let _ = self.reload().await;
                }
            }
        }

        self.shutdown().await
    }

    /// Stop all schedulers and persist outstanding history
    pub async fn shutdown(&mut self) -> Result<()> {
        let stopped = self.stop_all().await;
        info!(stopped, "All schedulers stopped");
        self.recorder.flush().await?;
        Ok(())
    }
}
