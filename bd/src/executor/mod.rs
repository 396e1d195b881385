//! Copy executor boundary
//!
//! The daemon never copies files itself. A [`CopyExecutor`] performs one copy
//! invocation; [`invoke_with_retry`] wraps it with a fixed number of immediate
//! retries.

mod command;
mod config;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub use command::CommandExecutor;
pub use config::CopyConfig;

/// What to copy out of `source_dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyTarget {
    /// A single file name inside `source_dir`
    File(String),
    /// The whole directory tree
    Tree,
}

/// One copy invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub target: CopyTarget,
}

/// Raw result of an executor invocation
///
/// `output` is opaque; it is only ever decoded lossily for log lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOutput {
    pub output: Vec<u8>,
    /// Exit status code, `None` if the process was terminated by a signal
    pub status: Option<i32>,
}

impl CopyOutput {
    pub fn lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Classification of a finished invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    /// Exit status 0
    Copied,
    /// A benign status such as "nothing to copy"
    NothingToCopy(i32),
    /// Any other status
    Failed(Option<i32>),
}

impl CopyStatus {
    pub fn classify(status: Option<i32>, benign_exit_codes: &[i32]) -> Self {
        match status {
            Some(0) => Self::Copied,
            Some(code) if benign_exit_codes.contains(&code) => Self::NothingToCopy(code),
            other => Self::Failed(other),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Copy errors
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("failed to start copy program {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("copy exited with status {}: {output}", display_status(.status))]
    Exit { status: Option<i32>, output: String },
}

fn display_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

/// Performs a single copy invocation
#[async_trait]
pub trait CopyExecutor: Send + Sync {
    /// Run the copy; `Ok` means the executor ran, whatever its status code
    async fn invoke(&self, request: &CopyRequest) -> Result<CopyOutput, CopyError>;
}

/// Report of a successful copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub status: CopyStatus,
    pub attempts: u32,
    pub output: CopyOutput,
}

/// Invoke `executor` up to `attempts` times, stopping at the first success
///
/// No backoff between attempts. When every attempt fails the last error is
/// returned.
pub async fn invoke_with_retry(
    executor: &dyn CopyExecutor,
    request: &CopyRequest,
    attempts: u32,
    benign_exit_codes: &[i32],
) -> Result<CopyReport, CopyError> {
    let attempts = attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        debug!(attempt, attempts, ?request, "invoke_with_retry: attempt");
        let err = match executor.invoke(request).await {
            Ok(output) => {
                let status = CopyStatus::classify(output.status, benign_exit_codes);
                if status.is_success() {
                    return Ok(CopyReport {
                        status,
                        attempts: attempt,
                        output,
                    });
                }
                CopyError::Exit {
                    status: output.status,
                    output: truncate(output.lossy()),
                }
            }
            Err(e) => e,
        };
        warn!(attempt, attempts, error = %err, "Copy attempt failed");
        last_err = Some(err);
    }

    Err(last_err.unwrap_or(CopyError::Exit {
        status: None,
        output: String::new(),
    }))
}

const MAX_ERROR_OUTPUT: usize = 4_000;

fn truncate(mut output: String) -> String {
    if output.len() > MAX_ERROR_OUTPUT {
        let mut cut = MAX_ERROR_OUTPUT;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("...[truncated]");
    }
    output
}
