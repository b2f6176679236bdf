//! CLI argument structures and parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::check_cmd::CheckCommitCli;
use crate::config_cmd::ConfigCli;
use crate::post_commit_cmd::PostCommitCli;
use crate::revert_cmd::RevertCli;
use crate::status_cmd::StatusCli;
use crate::test_cmd::TestCli;
use crate::watch_cmd::WatchCli;

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors
    Warn,
    /// Show informational messages, warnings, and errors (default)
    #[default]
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// wipguard - limit work in progress
///
/// Warns when uncommitted changes grow too big and can revert them after an
/// idle timeout.
#[derive(Debug, Parser)]
#[command(name = "wipguard")]
#[command(author, version)]
#[command(about = "Limit work in progress in a git working tree", long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/wipguard/config.toml)
    #[arg(long = "config", short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Set log verbosity level (error, warn, info, debug, trace)
    #[arg(
        long = "log-level",
        short = 'L',
        value_enum,
        default_value = "info",
        global = true
    )]
    pub log_level: LogLevel,

    /// Enable verbose output (same as --log-level debug)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Enable trace-level logging for debugging
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch a repository: run the auto-revert timer and the change-size watchdog
    #[command(display_order = 1)]
    Watch(WatchCli),

    /// Show the current change size against the threshold
    #[command(display_order = 2)]
    Status(StatusCli),

    /// Revert all uncommitted changes once
    #[command(display_order = 3)]
    Revert(RevertCli),

    /// Check whether the staged change may be committed (for pre-commit hooks)
    #[command(display_order = 4, name = "check-commit")]
    CheckCommit(CheckCommitCli),

    /// Run the tests, then commit or revert (TCR) or count the run (Limbo)
    #[command(display_order = 5)]
    Test(TestCli),

    /// Record a commit (for post-commit hooks)
    #[command(display_order = 6, name = "post-commit")]
    PostCommit(PostCommitCli),

    /// Show or create the configuration file
    #[command(display_order = 7)]
    Config(ConfigCli),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["wipguard", "status", "--json", "-v", "--config", "x.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Status(ref s) if s.json));
    }

    #[test]
    fn test_test_command_takes_trailing_args() {
        let cli = Cli::parse_from(["wipguard", "test", "-m", "green", "--", "cargo", "test", "-q"]);
        let Commands::Test(test) = cli.command else {
            panic!("expected the test command");
        };
        assert_eq!(test.message.as_deref(), Some("green"));
        assert_eq!(test.command, vec!["cargo", "test", "-q"]);
    }
}
