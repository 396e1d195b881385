//! Watcher module for configuration file monitoring
//!
//! The ConfigWatcher polls the configuration file's modification time and
//! asks the supervisor to reload when it changes.

mod config;
mod config_watcher;

pub use config::WatcherConfig;
pub use config_watcher::{ConfigWatcher, ReloadRequest};
