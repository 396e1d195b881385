//! TaskRunner - one copy cycle for one task
//!
//! Checks the source and destination, invokes the copy executor with retries
//! and turns the result into a [`RunOutcome`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::domain::{RunOutcome, Task};
use crate::executor::{CopyConfig, CopyError, CopyExecutor, CopyReport, CopyRequest, CopyTarget, invoke_with_retry};

/// Reasons a run did not complete
#[derive(Debug, Error)]
pub enum RunError {
    #[error("source {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("destination {path} could not be created: {source}")]
    DestinationUnusable { path: PathBuf, source: io::Error },

    #[error("destination {0} is a regular file")]
    DestinationInvalid(PathBuf),

    #[error("source {0} is neither a file nor a directory")]
    SourceUnsupported(PathBuf),

    #[error(transparent)]
    Copy(#[from] CopyError),
}

/// Executes copy cycles against a shared executor
pub struct TaskRunner {
    executor: Arc<dyn CopyExecutor>,
    retry_count: u32,
    benign_exit_codes: Vec<i32>,
}

impl TaskRunner {
    pub fn new(executor: Arc<dyn CopyExecutor>, retry_count: u32, benign_exit_codes: Vec<i32>) -> Self {
        Self {
            executor,
            retry_count,
            benign_exit_codes,
        }
    }

    pub fn from_config(executor: Arc<dyn CopyExecutor>, config: &CopyConfig) -> Self {
        Self::new(executor, config.retry_count, config.benign_exit_codes.clone())
    }

    /// Run one cycle; always yields an outcome
    pub async fn run(&self, task: &Task) -> RunOutcome {
        info!(task = %task.name, "Starting backup");
        match self.try_run(task).await {
            Ok(report) => {
                info!(
                    task = %task.name,
                    status = ?report.status,
                    attempts = report.attempts,
                    "Backup finished"
                );
                debug!(task = %task.name, output = %report.output.lossy(), "Copy output");
                RunOutcome::success(Local::now())
            }
            Err(e) => {
                error!(task = %task.name, error = %e, "Backup failed");
                RunOutcome::fail(Local::now())
            }
        }
    }

    /// Run one cycle, returning the copy report or the reason it failed
    pub async fn try_run(&self, task: &Task) -> Result<CopyReport, RunError> {
        check(task).await?;
        let request = plan(task).await?;
        let report = invoke_with_retry(
            self.executor.as_ref(),
            &request,
            self.retry_count,
            &self.benign_exit_codes,
        )
        .await?;
        Ok(report)
    }
}

/// Precondition checks, in order: source exists, destination usable and not a file
async fn check(task: &Task) -> Result<(), RunError> {
    debug!(task = %task.name, "check: called");
    if fs::metadata(&task.src).await.is_err() {
        return Err(RunError::SourceMissing(task.src.clone()));
    }

    let unusable = |source| RunError::DestinationUnusable {
        path: task.dst.clone(),
        source,
    };
    if fs::metadata(&task.dst).await.is_err() {
        warn!(dst = %task.dst.display(), "Destination does not exist, creating it");
        fs::create_dir_all(&task.dst).await.map_err(unusable)?;
    }

    let meta = fs::metadata(&task.dst).await.map_err(unusable)?;
    if meta.is_file() {
        return Err(RunError::DestinationInvalid(task.dst.clone()));
    }
    Ok(())
}

/// Build the copy request for the task's source kind
async fn plan(task: &Task) -> Result<CopyRequest, RunError> {
    let meta = fs::metadata(&task.src).await.map_err(|_| RunError::SourceMissing(task.src.clone()))?;

    if meta.is_file() {
        let (Some(parent), Some(file_name)) = (task.src.parent(), task.src.file_name()) else {
            return Err(RunError::SourceUnsupported(task.src.clone()));
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        return Ok(CopyRequest {
            source_dir: parent.to_path_buf(),
            dest_dir: task.dst.clone(),
            target: CopyTarget::File(file_name.to_string_lossy().into_owned()),
        });
    }

    if meta.is_dir() {
        let dest_dir = match task.src.file_name() {
            Some(base) => task.dst.join(base),
            None => task.dst.clone(),
        };
        return Ok(CopyRequest {
            source_dir: task.src.clone(),
            dest_dir,
            target: CopyTarget::Tree,
        });
    }

    Err(RunError::SourceUnsupported(task.src.clone()))
}
