//! backupd - periodic backup scheduler
//!
//! CLI entry point for running the scheduler and inspecting its state.

use std::fs;
use std::path::Path;

use chrono::Local;
use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use backupd::cli::{Cli, Command, LOG_FILE_NAME, OutputFormat, generate_after_help};
use backupd::config::Settings;
use backupd::daemon::Daemon;
use backupd::domain::{RunResult, Snapshot, StatusDocument};
use backupd::duration::{format_duration, parse_duration};
use backupd::store::ConfigStore;

fn setup_logging(cli_log_level: Option<&str>, settings_log_level: Option<&str>, log_dir: &Path) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > settings file > default (INFO)
    let level = match cli_log_level.or(settings_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help(&Settings::default().log_dir()));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let settings = Settings::load(cli.settings.as_ref()).context("Failed to load settings")?;

    // Setup logging with priority: CLI > settings > INFO default
    setup_logging(
        cli.log_level.as_deref(),
        settings.log_level.as_deref(),
        &settings.log_dir(),
    )
    .context("Failed to setup logging")?;

    let store = || -> Result<ConfigStore> {
        let (config_path, status_path) = settings
            .paths
            .resolve(cli.config.as_ref(), cli.status_file.as_ref())
            .context("Failed to resolve configuration paths")?;
        Ok(ConfigStore::new(config_path, status_path))
    };

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command.clone().unwrap_or(Command::Run) {
        Command::Run => cmd_run(settings.clone(), store()?).await,
        Command::Status { format } => cmd_status(&store()?, format),
        Command::Validate => cmd_validate(&store()?),
        Command::ParseDuration { value } => cmd_parse_duration(&value),
    }
}

/// Run the scheduler in the foreground
async fn cmd_run(settings: Settings, store: ConfigStore) -> Result<()> {
    debug!("cmd_run: called");
    println!("Watching {}", store.config_path().display());
    println!("Status file {}", store.status_path().display());
    println!("Press Ctrl-C to stop");
    Daemon::new(settings, store).run_until_ctrl_c().await
}

/// Print persisted run history
fn cmd_status(store: &ConfigStore, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let status = store.read_status()?.unwrap_or_default();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => print_status(&status),
    }
    Ok(())
}

fn print_status(status: &StatusDocument) {
    if status.tasks.is_empty() {
        println!("No run history recorded yet");
        return;
    }

    for task in &status.tasks {
        println!("{}", task.name.bold());
        println!("  {} -> {}", task.src, task.dst);
        match task.last_succ_time {
            Some(time) => println!("  last success: {}", time.format("%Y-%m-%d %H:%M:%S")),
            None => println!("  last success: {}", "never".yellow()),
        }
        for record in &task.recent_result {
            if record.ends_with(&RunResult::Success.to_string()) {
                println!("    {}", record.green());
            } else {
                println!("    {}", record.red());
            }
        }
    }
}

/// Load the configuration and print the resolved tasks
fn cmd_validate(store: &ConfigStore) -> Result<()> {
    debug!("cmd_validate: called");
    let snapshot = store
        .load()
        .with_context(|| format!("Invalid configuration {}", store.config_path().display()))?;
    print_tasks(&snapshot);
    println!("{} {} task(s)", "Configuration OK:".green(), snapshot.tasks.len());
    Ok(())
}

fn print_tasks(snapshot: &Snapshot) {
    let now = Local::now();
    for task in &snapshot.tasks {
        let due = match task.next_due() {
            Some(due) if due > now => due.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => "now".to_string(),
        };
        println!("{}", task.name.bold());
        println!("  {} -> {}", task.src.display(), task.dst.display());
        println!("  every {} ({}), next run {}", task.period_str, format_duration(task.period), due);
    }
}

/// Parse and print a duration string
fn cmd_parse_duration(value: &str) -> Result<()> {
    debug!(%value, "cmd_parse_duration: called");
    let duration = parse_duration(value).with_context(|| format!("Invalid duration {:?}", value))?;
    println!("{} = {}s ({})", value.trim(), duration.as_secs(), format_duration(duration));
    Ok(())
}
