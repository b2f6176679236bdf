//! wipguard - main entry point.
//!
//! Keeps a git working tree small: warns when the uncommitted change grows
//! past a threshold and, when enabled, reverts uncommitted work after an idle
//! timeout.
//!
//! # Architecture
//!
//! - `cli/` - Command-line argument parsing and dispatch
//! - `notifier` - Log and console rendering of session events
//! - `*_cmd.rs` - Individual command implementations

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use wipguard_cli::cli::{Cli, LogLevel, dispatch_command};

/// Keeps the non-blocking log writer flushing until exit.
struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

fn log_level(cli: &Cli) -> LogLevel {
    if cli.trace {
        LogLevel::Trace
    } else if cli.verbose {
        LogLevel::Debug
    } else if let Ok(env_level) = std::env::var("WIPGUARD_LOG_LEVEL") {
        LogLevel::from_str_loose(&env_level).unwrap_or(cli.log_level)
    } else {
        cli.log_level
    }
}

fn filter_str(log_level: LogLevel) -> String {
    if std::env::var("RUST_LOG").is_ok() {
        format!(
            "error,wipguard={},wipguard_cli={},wipguard_core={},wipguard_git={}",
            log_level.as_filter_str(),
            log_level.as_filter_str(),
            log_level.as_filter_str(),
            log_level.as_filter_str()
        )
    } else {
        log_level.as_filter_str().to_string()
    }
}

/// Write logs to `path` instead of stderr.
fn setup_file_logging(path: &Path, filter: &str) -> Result<LogGuard> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .init();

    Ok(LogGuard { _guard: guard })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = filter_str(log_level(&cli));
    let _log_guard = match &cli.log_file {
        Some(path) => Some(setup_file_logging(path, &filter)?),
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(&filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    };

    dispatch_command(cli).await
}
