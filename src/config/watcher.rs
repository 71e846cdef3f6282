//! Settings document watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::join_errors;
use crate::config::validation::validate_settings;
use crate::probe::ProbeSettings;
use crate::store::document::read_document;

/// Monitors the probe settings document for edits made outside the admin API.
pub struct SettingsWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProbeSettings>,
}

impl SettingsWatcher {
    /// Returns the watcher and a receiver for validated settings.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProbeSettings>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// The parent directory is watched rather than the file, because the
    /// document is replaced by rename on every write.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant && (event.kind.is_modify() || event.kind.is_create()) {
                        if let Some(settings) = reload(&path) {
                            let _ = tx.send(settings);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Settings watcher started");
        Ok(watcher)
    }
}

/// Read and validate the document; `None` keeps the current settings.
fn reload(path: &Path) -> Option<ProbeSettings> {
    match read_document(path) {
        Ok(Some(settings)) => match validate_settings(&settings) {
            Ok(()) => Some(settings),
            Err(errors) => {
                tracing::error!(
                    errors = %join_errors(&errors),
                    "Edited settings document is invalid. Keeping current settings."
                );
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::error!("Failed to reload settings document: {}. Keeping current settings.", e);
            None
        }
    }
}
