//! Auto-revert and change-size watchdog for wipguard.
//!
//! Two timer-driven state machines sit at the center of this crate:
//! [`AutoRevert`] discards the uncommitted working set after an idle timeout,
//! and [`ChangeSizeWatchdog`] warns when the uncommitted change grows past a
//! threshold without spamming the user. Everything that touches version
//! control or a user interface is reached through the narrow traits in
//! [`sink`], so the machines can be driven by a real repository or by a test.
//!
//! [`Tcr`] and [`Limbo`] react to test runs instead of the clock: TCR
//! commits on a passing run and reverts on a failing one, Limbo refuses
//! commits until a test has run.
//!
//! [`WipSession`] owns both timer machines and processes every event from a
//! single queue, which is what makes them safe to drive from a timer thread
//! and user callbacks at the same time.

pub mod auto_revert;
pub mod change_size;
pub mod config;
pub mod format;
pub mod limbo;
pub mod path_matcher;
pub mod session;
pub mod settings;
pub mod sink;
pub mod tcr;
pub mod timer;
pub mod watchdog;

pub use auto_revert::AutoRevert;
pub use change_size::{ChangeSize, ChangeSizesByPath};
pub use config::{TimeUnit, WipConfig};
pub use limbo::{Limbo, LimboSettings, LimboState};
pub use path_matcher::PathMatcher;
pub use session::{CheckinOutcome, SessionCommand, SessionHandle, SessionStatus, WipSession};
pub use settings::{NEVER, Settings};
pub use sink::{ActionSink, ChangeSizeProvider, CommitSink, NotificationSink};
pub use tcr::{ChangeListModifications, Tcr, TcrAction, TcrSettings, TcrState};
pub use timer::TimerSource;
pub use watchdog::ChangeSizeWatchdog;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WipError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Revert failed: {0}")]
    RevertFailed(String),
    #[error("Change size unavailable: {0}")]
    ChangeSizeUnavailable(String),
    #[error("Version control error: {0}")]
    Vcs(String),
    #[error("Session is no longer running")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, WipError>;
