// ABOUTME: Resolves YAML source specifiers, reads/interpolates/parses/validates/merges them
// ABOUTME: Caches the merged result keyed by resolved paths + merge options (spec §4.1)

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::errors::{AppError, AppResult};

use super::interpolate::interpolate;
use super::merge::{merge_documents, MergeOptions};
use super::schema::{MergedConfig, RawDocument};
use super::validate::{validate_cross_references, validate_document, ValidationIssue};

/// One entry in the ordered list of config sources to load (spec §4.1 inputs).
#[derive(Debug, Clone)]
pub enum SourceSpecifier {
    File { path: PathBuf, required: bool },
    Directory { path: PathBuf, required: bool },
    Glob { pattern: String, required: bool },
}

impl SourceSpecifier {
    #[must_use]
    pub const fn required(&self) -> bool {
        match self {
            Self::File { required, .. } | Self::Directory { required, .. } => *required,
            Self::Glob { required, .. } => *required,
        }
    }
}

/// Resolve every specifier to an ordered, deduplicated list of file paths
/// (spec §4.1 step 1). A missing required source fails; missing optional
/// sources are skipped with a warning.
pub fn resolve_paths(specifiers: &[SourceSpecifier]) -> AppResult<Vec<PathBuf>> {
    let mut resolved = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for spec in specifiers {
        let paths = match spec {
            SourceSpecifier::File { path, .. } => {
                if path.is_file() {
                    vec![path.clone()]
                } else {
                    Vec::new()
                }
            }
            SourceSpecifier::Directory { path, .. } => resolve_directory(path),
            SourceSpecifier::Glob { pattern, .. } => resolve_glob(pattern)?,
        };

        if paths.is_empty() {
            if spec.required() {
                return Err(AppError::config(format!(
                    "required config source not found: {}",
                    describe(spec)
                )));
            }
            tracing::warn!(source = %describe(spec), "optional config source not found, skipping");
            continue;
        }

        for path in paths {
            let canonical = path.canonicalize().unwrap_or(path);
            if seen.insert(canonical.clone()) {
                resolved.push(canonical);
            }
        }
    }

    Ok(resolved)
}

fn describe(spec: &SourceSpecifier) -> String {
    match spec {
        SourceSpecifier::File { path, .. } => path.display().to_string(),
        SourceSpecifier::Directory { path, .. } => path.display().to_string(),
        SourceSpecifier::Glob { pattern, .. } => pattern.clone(),
    }
}

fn resolve_directory(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let walker = walkdir_yaml(dir);
    for entry in walker {
        out.push(entry);
    }
    out.sort();
    out
}

/// Minimal recursive directory walk matching `*.yaml`/`*.yml`, avoiding a
/// dedicated crate dependency for a single-purpose traversal.
fn walkdir_yaml(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walkdir_yaml(&path));
        } else if is_yaml(&path) {
            out.push(path);
        }
    }
    out
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn resolve_glob(pattern: &str) -> AppResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    let paths = glob::glob(pattern).map_err(|e| AppError::config(format!("invalid glob '{pattern}': {e}")))?;
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => out.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(pattern, error = %e, "glob entry error, skipping"),
        }
    }
    out.sort();
    Ok(out)
}

/// Read, interpolate, and parse one YAML file into a [`RawDocument`],
/// returning schema validation issues alongside it (spec §4.1 steps 2-3).
pub fn load_document(path: &Path) -> AppResult<(RawDocument, Vec<ValidationIssue>)> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("failed to read {}: {e}", path.display())))?;
    let interpolated = interpolate(&raw);
    let doc: RawDocument = serde_yaml::from_str(&interpolated)
        .map_err(|e| AppError::config(format!("failed to parse {}: {e}", path.display())))?;
    let issues = validate_document(&doc);
    Ok((doc, issues))
}

/// Cache key: sorted resolved paths plus the merge options that produced
/// the cached value (spec §4.1 step 6).
fn cache_key(paths: &[PathBuf], options: MergeOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    for p in paths {
        p.hash(&mut hasher);
    }
    options.merge_arrays.hash(&mut hasher);
    options.allow_duplicate_tools.hash(&mut hasher);
    options.allow_duplicate_sources.hash(&mut hasher);
    options.validate_merged.hash(&mut hasher);
    hasher.finish()
}

/// Caches merged configuration results keyed by resolved file set + merge
/// options, invalidated by the file watcher (spec §4.1 step 6).
#[derive(Default)]
pub struct ConfigCache {
    entries: DashMap<u64, Arc<MergedConfig>>,
}

impl ConfigCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, paths: &[PathBuf], options: MergeOptions) -> Option<Arc<MergedConfig>> {
        self.entries.get(&cache_key(paths, options)).map(|v| v.clone())
    }

    pub fn put(&self, paths: &[PathBuf], options: MergeOptions, config: Arc<MergedConfig>) {
        self.entries.insert(cache_key(paths, options), config);
    }

    /// Drop every cached entry. Called by the watcher on any file change;
    /// entries are small in number so coarse invalidation is acceptable.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}

/// Load, interpolate, validate, and merge every specifier into a
/// [`MergedConfig`], consulting `cache` first.
pub fn load_and_merge(
    specifiers: &[SourceSpecifier],
    options: MergeOptions,
    cache: &ConfigCache,
) -> AppResult<Arc<MergedConfig>> {
    let paths = resolve_paths(specifiers)?;

    if let Some(cached) = cache.get(&paths, options) {
        return Ok(cached);
    }

    let mut docs = Vec::new();
    let mut all_issues = Vec::new();
    for path in &paths {
        let (doc, issues) = load_document(path)?;
        if !issues.is_empty() {
            for issue in &issues {
                all_issues.push(format!("{}: {} ({})", path.display(), issue.message, issue.path));
            }
        }
        docs.push((path.display().to_string(), doc));
    }

    if !all_issues.is_empty() {
        return Err(AppError::config(format!(
            "{} schema validation error(s)",
            all_issues.len()
        ))
        .with_details(serde_json::json!({ "violations": all_issues })));
    }

    let merged = merge_documents(&docs, options)?;

    if options.validate_merged {
        let cross_issues = validate_cross_references(&merged);
        if !cross_issues.is_empty() {
            let details: Vec<String> = cross_issues
                .iter()
                .map(|i| format!("{}: {}", i.path, i.message))
                .collect();
            return Err(AppError::config(format!(
                "{} cross-reference error(s)",
                details.len()
            ))
            .with_details(serde_json::json!({ "violations": details })));
        }
    }

    let merged = Arc::new(merged);
    cache.put(&paths, options, merged.clone());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_single_valid_file() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "tools.yaml",
            r"
sources:
  s1: { host: h, user: u, password: p }
tools:
  t1:
    source: s1
    description: d
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
",
        );
        let specs = vec![SourceSpecifier::File { path, required: true }];
        let cache = ConfigCache::new();
        let merged = load_and_merge(&specs, MergeOptions::default(), &cache).unwrap();
        assert_eq!(merged.tools.len(), 1);
        assert_eq!(merged.sources.len(), 1);
    }

    #[test]
    fn missing_required_file_fails() {
        let specs = vec![SourceSpecifier::File {
            path: PathBuf::from("/nonexistent/path.yaml"),
            required: true,
        }];
        let cache = ConfigCache::new();
        assert!(load_and_merge(&specs, MergeOptions::default(), &cache).is_err());
    }

    #[test]
    fn missing_optional_file_skipped() {
        let specs = vec![SourceSpecifier::File {
            path: PathBuf::from("/nonexistent/path.yaml"),
            required: false,
        }];
        let cache = ConfigCache::new();
        let result = load_and_merge(&specs, MergeOptions::default(), &cache);
        // No sources/tools loaded at all -> empty-config cross-reference error.
        assert!(result.is_err());
    }

    #[test]
    fn directory_specifier_finds_nested_yaml() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        write_file(
            &nested,
            "a.yaml",
            r"
sources:
  s1: { host: h, user: u, password: p }
",
        );
        write_file(
            dir.path(),
            "b.yml",
            r"
tools:
  t1: { source: s1, description: d, statement: 'SELECT 1 FROM sysibm.sysdummy1' }
",
        );
        let specs = vec![SourceSpecifier::Directory {
            path: dir.path().to_path_buf(),
            required: true,
        }];
        let cache = ConfigCache::new();
        let merged = load_and_merge(&specs, MergeOptions::default(), &cache).unwrap();
        assert_eq!(merged.sources.len(), 1);
        assert_eq!(merged.tools.len(), 1);
    }

    #[test]
    fn cache_hits_on_repeat_load() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "tools.yaml",
            r"
sources:
  s1: { host: h, user: u, password: p }
tools:
  t1: { source: s1, description: d, statement: 'SELECT 1 FROM sysibm.sysdummy1' }
",
        );
        let specs = vec![SourceSpecifier::File { path, required: true }];
        let cache = ConfigCache::new();
        let first = load_and_merge(&specs, MergeOptions::default(), &cache).unwrap();
        let second = load_and_merge(&specs, MergeOptions::default(), &cache).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
