//! Config file hot reload.
//!
//! Watches the directory holding the config file, since editors often
//! replace a file instead of writing it in place, and signals once per burst
//! of changes to that file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Keeps the file system watch alive; dropping it stops reload signals.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching `config_path`. Each change sends `()` on the returned
    /// channel.
    pub fn start(config_path: &Path) -> notify::Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = config_path.file_name().map(|n| n.to_os_string());

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if let Err(e) = notify_tx.send(result) {
                    debug!("Config watcher channel closed: {}", e);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || {
            let mut pending = false;
            loop {
                match notify_rx.recv_timeout(DEBOUNCE) {
                    Ok(Ok(event)) => {
                        if event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
                        {
                            pending = true;
                        }
                    }
                    Ok(Err(e)) => error!("Config watch error: {}", e),
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                        if pending {
                            pending = false;
                            if reload_tx.send(()).is_err() {
                                break;
                            }
                        }
                    }
                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Config watcher stopped");
        });

        info!("Watching {} for changes", config_path.display());
        Ok((Self { _watcher: watcher }, reload_rx))
    }
}
