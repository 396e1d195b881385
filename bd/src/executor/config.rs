//! Copy executor configuration

use serde::{Deserialize, Serialize};

/// Configuration for the external copy command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Program invoked as `program <source_dir> <dest_dir> <file|recursive-flag>`
    #[serde(default = "default_program")]
    pub program: String,

    /// Third argument used when copying a whole directory
    #[serde(default = "default_recursive_flag", rename = "recursive-flag")]
    pub recursive_flag: String,

    /// Attempts per run before the run is recorded as failed
    #[serde(default = "default_retry_count", rename = "retry-count")]
    pub retry_count: u32,

    /// Exit codes meaning "nothing to copy", treated as success
    #[serde(default = "default_benign_exit_codes", rename = "benign-exit-codes")]
    pub benign_exit_codes: Vec<i32>,
}

fn default_program() -> String {
    "robocopy".to_string()
}

fn default_recursive_flag() -> String {
    "/e".to_string()
}

fn default_retry_count() -> u32 {
    5
}

fn default_benign_exit_codes() -> Vec<i32> {
    vec![2]
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            recursive_flag: default_recursive_flag(),
            retry_count: default_retry_count(),
            benign_exit_codes: default_benign_exit_codes(),
        }
    }
}
