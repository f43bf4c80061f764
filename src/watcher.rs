//! Bindings file watcher for hot reload.
//!
//! Edits to the bindings file show up live. A reload that cannot read the
//! file keeps the previous in-memory list; malformed lines are skipped by
//! the loader as usual, so a bad manual edit never clobbers valid bindings.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::binding::Binding;
use crate::prefs;

/// Watches the bindings file and delivers freshly loaded lists.
pub struct BindingsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Vec<Binding>>,
}

impl BindingsWatcher {
    /// Start watching an existing bindings file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel(10);

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime_handle = tokio::runtime::Handle::current();
        let watched = path.clone();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        debug!("Bindings file changed: {:?}", event.paths);
                        let path = watched.clone();
                        let tx = tx.clone();
                        runtime_handle.spawn(async move {
                            // Debounce: wait a bit for file writes to complete
                            tokio::time::sleep(Duration::from_millis(100)).await;

                            match prefs::load_bindings(&path).await {
                                Ok(bindings) => {
                                    info!("Bindings reloaded ({} entries)", bindings.len());
                                    if let Err(e) = tx.send(bindings).await {
                                        error!("Failed to send bindings update: {}", e);
                                    }
                                }
                                Err(e) => {
                                    warn!("Failed to reload bindings (keeping current): {}", e);
                                }
                            }
                        });
                    }
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            })?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch bindings file: {}", path.display()))?;

        info!("Bindings watcher started for: {}", path.display());
        Ok(Self { _watcher: watcher, rx })
    }

    /// Wait for the next reloaded binding list; `None` once the watcher is
    /// closed.
    pub async fn next_bindings(&mut self) -> Option<Vec<Binding>> {
        self.rx.recv().await
    }
}
