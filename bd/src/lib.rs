//! backupd - periodic backup scheduler
//!
//! backupd copies configured source paths to destination paths, each task on
//! its own period. The task list is a YAML document that is watched and
//! hot-reloaded; per-task run history is persisted to a separate status file
//! and carried across reloads and restarts.
//!
//! # Core Concepts
//!
//! - **Catch-up**: a task whose last success is more than a period ago runs
//!   immediately; otherwise it waits out the remainder of the period
//! - **Whole-set reconciliation**: every reload stops and joins all running
//!   schedulers before starting one per task in the new configuration
//! - **Identity**: tasks match across reloads by cleaned source and destination
//! - **Single writer**: one actor owns run history and the status file
//!
//! # Modules
//!
//! - [`duration`] - Period strings such as `30m` and `1mo`
//! - [`domain`] - Tasks, history, configuration and status documents
//! - [`store`] - Loading configuration and persisting status
//! - [`executor`] - Copy executor trait and external command implementation
//! - [`runner`] - One copy cycle with precondition checks
//! - [`scheduler`] - Per-task timing loop
//! - [`status`] - Status recorder actor
//! - [`watcher`] - Configuration file polling
//! - [`supervisor`] - Scheduler reconciliation
//! - [`daemon`] - Wiring and shutdown
//! - [`config`] - Daemon settings
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod duration;
pub mod executor;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod supervisor;
pub mod watcher;

// Re-export commonly used types
pub use config::Settings;
pub use daemon::Daemon;
pub use domain::{ConfigDocument, History, RunOutcome, RunResult, Snapshot, StatusDocument, Task, TaskKey};
pub use duration::{DurationError, format_duration, parse_duration};
pub use executor::{CommandExecutor, CopyConfig, CopyError, CopyExecutor, CopyOutput, CopyRequest, CopyTarget};
pub use runner::{RunError, TaskRunner};
pub use scheduler::{SchedulerHandle, SchedulerState, TaskScheduler};
pub use status::{StatusError, StatusRecorder, StatusSink};
pub use store::{ConfigError, ConfigStore};
pub use supervisor::Supervisor;
pub use watcher::{ConfigWatcher, ReloadRequest, WatcherConfig};
