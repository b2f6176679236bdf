//! wipguard command-line interface.

pub mod check_cmd;
pub mod cli;
pub mod config_cmd;
pub mod console;
pub mod notifier;
pub mod post_commit_cmd;
pub mod revert_cmd;
pub mod reload;
pub mod status_cmd;
pub mod test_cmd;
pub mod utils;
pub mod watch_cmd;
