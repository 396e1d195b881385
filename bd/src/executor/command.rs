//! External command copy executor

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{CopyConfig, CopyError, CopyExecutor, CopyOutput, CopyRequest, CopyTarget};

/// Runs the configured copy program, e.g. `robocopy <src> <dst> /e`
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    recursive_flag: String,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, recursive_flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            recursive_flag: recursive_flag.into(),
        }
    }

    pub fn from_config(config: &CopyConfig) -> Self {
        Self::new(&config.program, &config.recursive_flag)
    }

    fn command(&self, request: &CopyRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&request.source_dir).arg(&request.dest_dir);
        match &request.target {
            CopyTarget::File(name) => cmd.arg(name),
            CopyTarget::Tree => cmd.arg(&self.recursive_flag),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CopyExecutor for CommandExecutor {
    async fn invoke(&self, request: &CopyRequest) -> Result<CopyOutput, CopyError> {
        debug!(program = %self.program, ?request, "CommandExecutor::invoke: called");
        let output = self
            .command(request)
            .output()
            .await
            .map_err(|source| CopyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = output.stdout;
        if !output.stderr.is_empty() {
            combined.extend_from_slice(b"\n");
            combined.extend_from_slice(&output.stderr);
        }

        debug!(status = ?output.status.code(), bytes = combined.len(), "CommandExecutor::invoke: finished");
        Ok(CopyOutput {
            output: combined,
            status: output.status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(target: CopyTarget) -> CopyRequest {
        CopyRequest {
            source_dir: PathBuf::from("/from"),
            dest_dir: PathBuf::from("/to"),
            target,
        }
    }

    #[tokio::test]
    async fn test_arguments_for_tree() {
        let exec = CommandExecutor::new("echo", "-r");
        let out = exec.invoke(&request(CopyTarget::Tree)).await.unwrap();
        assert_eq!(out.status, Some(0));
        assert_eq!(out.lossy().trim(), "/from /to -r");
    }

    #[tokio::test]
    async fn test_arguments_for_file() {
        let exec = CommandExecutor::new("echo", "-r");
        let out = exec
            .invoke(&request(CopyTarget::File("notes.txt".to_string())))
            .await
            .unwrap();
        assert_eq!(out.lossy().trim(), "/from /to notes.txt");
    }

    #[tokio::test]
    async fn test_nonzero_status_is_reported() {
        let exec = CommandExecutor::new("false", "-r");
        let out = exec.invoke(&request(CopyTarget::Tree)).await.unwrap();
        assert_eq!(out.status, Some(1));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let exec = CommandExecutor::new("/definitely/not/a/program", "-r");
        let err = exec.invoke(&request(CopyTarget::Tree)).await.unwrap_err();
        assert!(matches!(err, CopyError::Spawn { .. }));
    }
}
