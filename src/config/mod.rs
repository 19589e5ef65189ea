// ABOUTME: Configuration pipeline — resolve, interpolate, validate, merge, cache, watch
// ABOUTME: Entry point is `ConfigLoader`, which owns the cache and optional file watcher

//! # Config Loader (spec §4.1)
//!
//! Produces a validated, merged [`schema::MergedConfig`] from one or more
//! YAML sources. See [`loader`] for the per-file pipeline and [`merge`] for
//! the merge policy.

pub mod environment;
pub mod interpolate;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod validate;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::AppResult;

pub use loader::{ConfigCache, SourceSpecifier};
pub use merge::MergeOptions;
pub use schema::MergedConfig;
pub use watcher::{ConfigWatcher, ReloadEvent};

/// Owns the config cache and (optionally) a file watcher; the single entry
/// point the rest of the server uses to obtain a [`MergedConfig`].
pub struct ConfigLoader {
    specifiers: Vec<SourceSpecifier>,
    options: MergeOptions,
    cache: Arc<ConfigCache>,
    watcher: Option<ConfigWatcher>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(specifiers: Vec<SourceSpecifier>, options: MergeOptions) -> Self {
        Self {
            specifiers,
            options,
            cache: Arc::new(ConfigCache::new()),
            watcher: None,
        }
    }

    /// Load (or return the cached) merged configuration.
    pub fn load(&self) -> AppResult<Arc<MergedConfig>> {
        loader::load_and_merge(&self.specifiers, self.options, &self.cache)
    }

    /// Start watching the resolved files for changes, invalidating the
    /// cache on any event. Safe to call even if no files exist yet at
    /// startup; resolution happens on the next `load()`.
    pub fn start_watching(&mut self) -> AppResult<()> {
        let paths = loader::resolve_paths(&self.specifiers)?;
        self.watcher = ConfigWatcher::watch(&paths, self.cache.clone());
        Ok(())
    }

    #[must_use]
    pub fn subscribe_reloads(&self) -> Option<tokio::sync::broadcast::Receiver<ReloadEvent>> {
        self.watcher.as_ref().map(ConfigWatcher::subscribe)
    }
}

/// Build a `--tools <path>` specifier list, treating `path` as a file,
/// directory, or glob pattern depending on its shape (spec §6.3).
#[must_use]
pub fn specifier_from_path_arg(path: &str) -> Vec<SourceSpecifier> {
    if path.contains('*') || path.contains('?') || path.contains('[') {
        vec![SourceSpecifier::Glob {
            pattern: path.to_owned(),
            required: true,
        }]
    } else {
        let pb = PathBuf::from(path);
        if pb.is_dir() {
            vec![SourceSpecifier::Directory { path: pb, required: true }]
        } else {
            vec![SourceSpecifier::File { path: pb, required: true }]
        }
    }
}
