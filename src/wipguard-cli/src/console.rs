//! Commands typed into a running `watch`.

use std::io::BufRead;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const HELP_TEXT: &str = "Commands: start, stop, toggle, skip, unskip, force-commit, status, help, quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Toggle,
    Skip,
    Unskip,
    ForceCommit,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(ConsoleCommand::Start),
            "stop" => Ok(ConsoleCommand::Stop),
            "toggle" | "t" => Ok(ConsoleCommand::Toggle),
            "skip" => Ok(ConsoleCommand::Skip),
            "unskip" => Ok(ConsoleCommand::Unskip),
            "force-commit" | "force" => Ok(ConsoleCommand::ForceCommit),
            "status" | "s" => Ok(ConsoleCommand::Status),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(format!("Unknown command '{other}'")),
        }
    }
}

/// Read commands from stdin until it closes.
///
/// Uses a plain thread so a pending read never holds up runtime shutdown.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<ConsoleCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read console input: {}", e);
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ConsoleCommand>() {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                Err(e) => warn!("{}. {}", e, HELP_TEXT),
            }
        }
        debug!("Console input closed");
    });
    rx
}
