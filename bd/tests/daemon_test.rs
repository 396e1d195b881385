//! Integration tests for backupd
//!
//! These tests run the whole daemon against temporary files with a recording
//! copy executor in place of an external program.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use backupd::config::Settings;
use backupd::daemon::Daemon;
use backupd::executor::{CopyError, CopyExecutor, CopyOutput, CopyRequest, CopyTarget};
use backupd::store::ConfigStore;
use backupd::watcher::WatcherConfig;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingExecutor {
    requests: Mutex<Vec<CopyRequest>>,
}

impl RecordingExecutor {
    fn sources(&self) -> Vec<PathBuf> {
        self.requests.lock().unwrap().iter().map(|r| r.source_dir.clone()).collect()
    }
}

#[async_trait]
impl CopyExecutor for RecordingExecutor {
    async fn invoke(&self, request: &CopyRequest) -> Result<CopyOutput, CopyError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(CopyOutput {
            output: Vec::new(),
            status: Some(0),
        })
    }
}

fn settings() -> Settings {
    Settings {
        watcher: WatcherConfig { poll_interval_secs: 1 },
        ..Default::default()
    }
}

fn write_config(root: &Path, sources: &[&str]) {
    let mut yaml = format!("default_dst: {}\ndefault_period: 1d\ntasks:\n", root.join("dst").display());
    for src in sources {
        yaml.push_str(&format!("  - src: {}\n", root.join(src).display()));
    }
    let path = root.join("backup.yaml");
    fs::write(&path, yaml).unwrap();

    // Make sure the watcher sees a newer mtime even on coarse filesystems
    let file = fs::File::options().write(true).open(&path).unwrap();
    let bump = SystemTime::now() + Duration::from_secs(60 * (sources.len() as u64));
    file.set_modified(bump).unwrap();
}

async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

#[tokio::test]
async fn test_daemon_runs_tasks_and_persists_history() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("notes.txt"), "hello").unwrap();
    write_config(root, &["docs", "notes.txt"]);

    let store = ConfigStore::new(root.join("backup.yaml"), root.join("backup_status.yaml"));
    let exec = Arc::new(RecordingExecutor::default());
    let daemon = Daemon::with_executor(settings(), store, exec.clone());

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(daemon.run(shutdown_rx));

    assert!(wait_for(|| exec.sources().len() >= 2).await, "both tasks should run on startup");
    shutdown_tx.send(()).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    result.expect("daemon should shut down").unwrap().unwrap();

    let requests = exec.requests.lock().unwrap().clone();
    let tree = requests.iter().find(|r| r.target == CopyTarget::Tree).unwrap();
    assert_eq!(tree.dest_dir, root.join("dst").join("docs"));
    let file = requests
        .iter()
        .find(|r| r.target == CopyTarget::File("notes.txt".to_string()))
        .unwrap();
    assert_eq!(file.source_dir, root.to_path_buf());

    let status = ConfigStore::new(root.join("backup.yaml"), root.join("backup_status.yaml"))
        .read_status()
        .unwrap()
        .expect("status file should exist");
    assert_eq!(status.tasks.len(), 2);
    assert!(status.tasks.iter().all(|t| t.last_succ_time.is_some()));
    assert!(status.tasks.iter().all(|t| t.recent_result.len() == 1));
}

#[tokio::test]
async fn test_daemon_picks_up_configuration_changes() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();
    for name in ["a", "b"] {
        fs::create_dir_all(root.join(name)).unwrap();
    }
    write_config(root, &["a"]);

    let store = ConfigStore::new(root.join("backup.yaml"), root.join("backup_status.yaml"));
    let exec = Arc::new(RecordingExecutor::default());
    let daemon = Daemon::with_executor(settings(), store, exec.clone());

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(daemon.run(shutdown_rx));
    assert!(wait_for(|| exec.sources().len() == 1).await);

    write_config(root, &["a", "b"]);
    assert!(
        wait_for(|| exec.sources().contains(&root.join("b"))).await,
        "new task should run after reload"
    );

    shutdown_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("daemon should shut down")
        .unwrap()
        .unwrap();

    // Task a was restarted but not overdue, so it ran only once
    let a_runs = exec.sources().iter().filter(|s| **s == root.join("a")).count();
    assert_eq!(a_runs, 1);
}

#[tokio::test]
async fn test_invalid_configuration_does_not_stop_daemon() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();
    fs::write(root.join("backup.yaml"), "tasks:\n  - src: /nowhere\n").unwrap();

    let store = ConfigStore::new(root.join("backup.yaml"), root.join("backup_status.yaml"));
    let exec = Arc::new(RecordingExecutor::default());
    let daemon = Daemon::with_executor(settings(), store, exec.clone());

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(daemon.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!handle.is_finished());
    assert!(exec.sources().is_empty());

    shutdown_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("daemon should shut down")
        .unwrap()
        .unwrap();
}
