//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// backupd - periodic backup scheduler
#[derive(Parser)]
#[command(
    name = "bd",
    about = "Periodically copies configured sources to their backup destinations",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to daemon settings file
    #[arg(short, long, global = true, help = "Path to daemon settings file")]
    pub settings: Option<PathBuf>,

    /// Path to the backup configuration document
    #[arg(short, long, global = true, help = "Path to the backup configuration document")]
    pub config: Option<PathBuf>,

    /// Path to the status file
    #[arg(long = "status-file", global = true, help = "Path to the status file")]
    pub status_file: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler in the foreground until Ctrl-C (default)
    Run,

    /// Show persisted run history
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Load the configuration and print the resolved tasks
    Validate,

    /// Parse a period string such as 30m, 2d or 1mo
    ParseDuration {
        /// Duration string
        value: String,
    },
}

/// Output format for the status command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Footer for `--help` showing where logs go
pub fn generate_after_help(log_dir: &std::path::Path) -> String {
    format!("Logs are written to: {}", log_dir.join(LOG_FILE_NAME).display())
}

/// Name of the log file inside the log directory
pub const LOG_FILE_NAME: &str = "backupd.log";
