//! StatusRecorder - actor that owns run history
//!
//! Every task reports outcomes through a cloned [`StatusRecorder`] handle. A
//! single actor applies them and writes the status document, so writes are
//! serialized and bursts of updates collapse into one write.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::messages::{StatusCommand, StatusError};
use crate::domain::{RunOutcome, StatusDocument, TaskKey};
use crate::store::{ConfigError, ConfigStore};

/// Default capacity of the command channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Where the recorder writes the status document
pub trait StatusSink: Send + Sync {
    fn persist(&self, status: &StatusDocument) -> Result<(), ConfigError>;
}

impl StatusSink for ConfigStore {
    fn persist(&self, status: &StatusDocument) -> Result<(), ConfigError> {
        self.persist_status(status)
    }
}

/// Handle to send commands to the recorder actor
#[derive(Clone)]
pub struct StatusRecorder {
    tx: mpsc::Sender<StatusCommand>,
}

impl StatusRecorder {
    /// Spawn the actor; history is persisted through `sink`
    pub fn spawn(sink: Arc<dyn StatusSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        debug!(capacity, "StatusRecorder::spawn: called");
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let actor = RecorderActor {
            sink,
            document: StatusDocument::default(),
            dirty: false,
        };
        let handle = tokio::spawn(actor.run(rx));
        (Self { tx }, handle)
    }

    /// Report a run outcome for the task identified by `key`
    pub async fn record(&self, key: TaskKey, outcome: RunOutcome) -> Result<(), StatusError> {
        debug!(%key, result = %outcome.result, "StatusRecorder::record: called");
        self.send(StatusCommand::Record { key, outcome }).await
    }

    /// Swap in the status view of a newly reconciled snapshot
    pub async fn replace(&self, document: StatusDocument) -> Result<(), StatusError> {
        debug!(tasks = document.tasks.len(), "StatusRecorder::replace: called");
        self.send(StatusCommand::Replace { document }).await
    }

    /// Current in-memory status document
    pub async fn snapshot(&self) -> Result<StatusDocument, StatusError> {
        let (reply, rx) = oneshot::channel();
        self.send(StatusCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| StatusError::ChannelClosed)
    }

    /// Persist pending changes and wait for the write to finish
    pub async fn flush(&self) -> Result<(), StatusError> {
        let (reply, rx) = oneshot::channel();
        self.send(StatusCommand::Flush { reply }).await?;
        rx.await.map_err(|_| StatusError::ChannelClosed)
    }

    /// Ask the actor to persist pending changes and exit
    pub async fn shutdown(&self) -> Result<(), StatusError> {
        self.send(StatusCommand::Shutdown).await
    }

    async fn send(&self, cmd: StatusCommand) -> Result<(), StatusError> {
        self.tx.send(cmd).await.map_err(|_| StatusError::ChannelClosed)
    }
}

struct RecorderActor {
    sink: Arc<dyn StatusSink>,
    document: StatusDocument,
    dirty: bool,
}

impl RecorderActor {
    async fn run(mut self, mut rx: mpsc::Receiver<StatusCommand>) {
        info!("StatusRecorder started");

        while let Some(cmd) = rx.recv().await {
            let mut stop = self.handle(cmd);

            // Coalesce everything already queued into a single write
            while !stop {
                match rx.try_recv() {
                    Ok(cmd) => stop = self.handle(cmd),
                    Err(_) => break,
                }
            }

            self.persist_if_dirty();
            if stop {
                break;
            }
        }

        self.persist_if_dirty();
        info!("StatusRecorder stopped");
    }

    /// Apply one command; returns true on shutdown
    fn handle(&mut self, cmd: StatusCommand) -> bool {
        match cmd {
            StatusCommand::Record { key, outcome } => self.apply(&key, &outcome),
            StatusCommand::Replace { document } => {
                self.document = document;
                self.dirty = true;
            }
            StatusCommand::Snapshot { reply } => {
                let _ = reply.send(self.document.clone());
            }
            StatusCommand::Flush { reply } => {
                self.persist_if_dirty();
                let _ = reply.send(());
            }
            StatusCommand::Shutdown => return true,
        }
        false
    }

    fn apply(&mut self, key: &TaskKey, outcome: &RunOutcome) {
        let Some(status) = self.document.get_mut(key) else {
            debug!(%key, "RecorderActor::apply: no such task, ignoring outcome");
            return;
        };
        let mut history = status.history();
        history.record(outcome);
        status.set_history(history);
        self.dirty = true;
    }

    fn persist_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        match self.sink.persist(&self.document) {
            Ok(()) => {
                debug!(tasks = self.document.tasks.len(), "Status persisted");
                self.dirty = false;
            }
            Err(e) => {
                // Stays dirty; the next change retries the write
                error!(error = %e, "Failed to persist status");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RECENT_RESULT_CAPACITY, TaskStatus};
    use chrono::Local;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Keeps every written document in memory
    #[derive(Default)]
    struct CountingSink {
        writes: Mutex<Vec<StatusDocument>>,
    }

    impl CountingSink {
        fn writes(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        fn last(&self) -> Option<StatusDocument> {
            self.writes.lock().unwrap().last().cloned()
        }
    }

    impl StatusSink for CountingSink {
        fn persist(&self, status: &StatusDocument) -> Result<(), ConfigError> {
            self.writes.lock().unwrap().push(status.clone());
            Ok(())
        }
    }

    fn record_cmd(src: &str, dst: &str) -> StatusCommand {
        StatusCommand::Record {
            key: TaskKey::new(src, dst),
            outcome: RunOutcome::success(Local::now()),
        }
    }

    fn store_in(dir: &Path) -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new(dir.join("backup.yaml"), dir.join("backup_status.yaml")))
    }

    fn document(keys: &[(&str, &str)]) -> StatusDocument {
        StatusDocument {
            tasks: keys
                .iter()
                .map(|(src, dst)| TaskStatus {
                    name: format!("{}->{}", src, dst),
                    src: src.to_string(),
                    dst: dst.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_record_updates_history_and_persists() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let (recorder, _handle) = StatusRecorder::spawn(store.clone(), 16);

        recorder.replace(document(&[("/a", "/b")])).await.unwrap();
        let now = Local::now();
        recorder.record(TaskKey::new("/a", "/b"), RunOutcome::success(now)).await.unwrap();
        recorder.flush().await.unwrap();

        let persisted = store.read_status().unwrap().unwrap();
        let task = persisted.get(&TaskKey::new("/a", "/b")).unwrap();
        assert_eq!(task.recent_result.len(), 1);
        assert_eq!(task.last_succ_time.map(|t| t.timestamp()), Some(now.timestamp()));
    }

    #[tokio::test]
    async fn test_failure_does_not_touch_last_success() {
        let temp = tempdir().unwrap();
        let (recorder, _handle) = StatusRecorder::spawn(store_in(temp.path()), 16);
        recorder.replace(document(&[("/a", "/b")])).await.unwrap();
        recorder
            .record(TaskKey::new("/a", "/b"), RunOutcome::fail(Local::now()))
            .await
            .unwrap();

        let snapshot = recorder.snapshot().await.unwrap();
        let task = snapshot.get(&TaskKey::new("/a", "/b")).unwrap();
        assert!(task.last_succ_time.is_none());
        assert!(task.recent_result[0].ends_with("fail"));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let temp = tempdir().unwrap();
        let (recorder, _handle) = StatusRecorder::spawn(store_in(temp.path()), 8);
        recorder.replace(document(&[("/a", "/b")])).await.unwrap();
        for _ in 0..(RECENT_RESULT_CAPACITY + 5) {
            recorder
                .record(TaskKey::new("/a", "/b"), RunOutcome::success(Local::now()))
                .await
                .unwrap();
        }

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.tasks[0].recent_result.len(), RECENT_RESULT_CAPACITY);
    }

    #[tokio::test]
    async fn test_unknown_task_is_ignored() {
        let temp = tempdir().unwrap();
        let (recorder, _handle) = StatusRecorder::spawn(store_in(temp.path()), 16);
        recorder.replace(document(&[("/a", "/b")])).await.unwrap();
        recorder
            .record(TaskKey::new("/x", "/y"), RunOutcome::success(Local::now()))
            .await
            .unwrap();

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.tasks.len(), 1);
        assert!(snapshot.tasks[0].recent_result.is_empty());
    }

    #[tokio::test]
    async fn test_burst_of_records_is_written_once() {
        let sink = Arc::new(CountingSink::default());
        let (recorder, _handle) = StatusRecorder::spawn(sink.clone(), 64);
        recorder.replace(document(&[("/a", "/b"), ("/c", "/d")])).await.unwrap();
        recorder.flush().await.unwrap();
        assert_eq!(sink.writes(), 1);

        // Queue the burst without yielding so the actor sees it all at once
        for _ in 0..10 {
            recorder.tx.try_send(record_cmd("/a", "/b")).unwrap();
            recorder.tx.try_send(record_cmd("/c", "/d")).unwrap();
        }
        recorder.flush().await.unwrap();

        assert_eq!(sink.writes(), 2);
        let written = sink.last().unwrap();
        assert_eq!(written.tasks[0].recent_result.len(), 10);
        assert_eq!(written.tasks[1].recent_result.len(), 10);
    }

    #[tokio::test]
    async fn test_clean_state_is_not_rewritten() {
        let sink = Arc::new(CountingSink::default());
        let (recorder, _handle) = StatusRecorder::spawn(sink.clone(), 16);
        recorder.replace(document(&[("/a", "/b")])).await.unwrap();
        recorder.flush().await.unwrap();

        recorder.snapshot().await.unwrap();
        recorder.flush().await.unwrap();
        recorder.record(TaskKey::new("/x", "/y"), RunOutcome::success(Local::now())).await.unwrap();
        recorder.flush().await.unwrap();

        assert_eq!(sink.writes(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_not_fatal() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = Arc::new(ConfigStore::new(
            temp.path().join("backup.yaml"),
            blocker.join("status.yaml"),
        ));
        let (recorder, _handle) = StatusRecorder::spawn(store, 16);

        recorder.replace(document(&[("/a", "/b")])).await.unwrap();
        recorder
            .record(TaskKey::new("/a", "/b"), RunOutcome::success(Local::now()))
            .await
            .unwrap();
        recorder.flush().await.unwrap();

        // Actor is still alive and keeps the history in memory
        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.tasks[0].recent_result.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_persists_and_stops() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let (recorder, handle) = StatusRecorder::spawn(store.clone(), 16);

        recorder.replace(document(&[("/a", "/b"), ("/c", "/d")])).await.unwrap();
        recorder.shutdown().await.unwrap();
        handle.await.unwrap();

        assert_eq!(store.read_status().unwrap().unwrap().tasks.len(), 2);
        assert!(matches!(recorder.snapshot().await, Err(StatusError::ChannelClosed)));
    }
}
