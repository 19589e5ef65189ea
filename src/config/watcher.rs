// ABOUTME: File-change watcher that invalidates the config cache and emits reload events
// ABOUTME: Watches each resolved file plus its parent directory for add/remove (spec §4.1 step 6, §5)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;

use super::loader::ConfigCache;

/// Emitted whenever a watched config file (or its parent directory) changes.
/// Consumers (the main configuration task, per spec §5) decide whether to
/// reload; the watcher itself only invalidates the cache and notifies.
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    pub path: PathBuf,
}

/// Watches a set of config files for changes. Construction never fails the
/// caller's startup path: watcher errors are logged and demoted to
/// warnings, per spec §4.1 failure semantics.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    pub events: broadcast::Receiver<ReloadEvent>,
}

impl ConfigWatcher {
    /// Start watching `paths` and each path's parent directory (to catch
    /// add/remove, not just modify). On any event, `cache` is invalidated
    /// and a [`ReloadEvent`] is broadcast to subscribers.
    pub fn watch(paths: &[PathBuf], cache: Arc<ConfigCache>) -> Option<Self> {
        let (tx, rx) = broadcast::channel(64);
        let watched: Vec<PathBuf> = paths.to_vec();

        let tx_for_handler = tx.clone();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in &event.paths {
                    cache.invalidate_all();
                    let _ = tx_for_handler.send(ReloadEvent { path: path.clone() });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "config watcher error");
            }
        };

        let mut watcher = match RecommendedWatcher::new(handler, notify::Config::default()) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, "failed to initialize config file watcher");
                return None;
            }
        };

        let mut dirs_watched = std::collections::HashSet::new();
        for path in &watched {
            if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
                tracing::warn!(path = %path.display(), error = %e, "failed to watch config file");
            }
            if let Some(parent) = parent_dir(path) {
                if dirs_watched.insert(parent.clone()) {
                    if let Err(e) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
                        tracing::warn!(path = %parent.display(), error = %e, "failed to watch config directory");
                    }
                }
            }
        }

        Some(Self {
            _watcher: watcher,
            events: rx,
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events.resubscribe()
    }
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent().map(Path::to_path_buf)
}
