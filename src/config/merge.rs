// ABOUTME: Merge policy for combining multiple parsed YAML documents into one MergedConfig
// ABOUTME: Implements duplicate/override semantics and array-concat toolset merging (spec §4.1 step 4)

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

use super::schema::{MergedConfig, RawDocument, ToolsetDescriptor};

/// Options governing how documents merge (spec §4.1, §6.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MergeOptions {
    pub merge_arrays: bool,
    pub allow_duplicate_tools: bool,
    pub allow_duplicate_sources: bool,
    pub validate_merged: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            merge_arrays: true,
            allow_duplicate_tools: false,
            allow_duplicate_sources: false,
            validate_merged: true,
        }
    }
}

/// Merge documents in declaration order into a single [`MergedConfig`].
///
/// # Errors
/// Returns [`AppError::ConfigError`](crate::errors::ErrorCode::ConfigError)
/// when a name collision occurs for sources/tools and the corresponding
/// `allow_duplicate_*` flag is `false`.
pub fn merge_documents(docs: &[(String, RawDocument)], options: MergeOptions) -> AppResult<MergedConfig> {
    let mut merged = MergedConfig::default();

    for (doc_path, doc) in docs {
        for (name, source) in &doc.sources {
            if merged.sources.contains_key(name) {
                if !options.allow_duplicate_sources {
                    return Err(AppError::config(format!(
                        "duplicate source '{name}' in {doc_path} (allow_duplicate_sources=false)"
                    )));
                }
                tracing::warn!(source = name, file = doc_path, "source overridden by later document");
            }
            merged.sources.insert(name.clone(), source.clone());
        }

        for (name, tool) in &doc.tools {
            if merged.tools.contains_key(name) {
                if !options.allow_duplicate_tools {
                    return Err(AppError::config(format!(
                        "duplicate tool '{name}' in {doc_path} (allow_duplicate_tools=false)"
                    )));
                }
                tracing::warn!(tool = name, file = doc_path, "tool overridden by later document");
            }
            merged.tools.insert(name.clone(), tool.clone());
        }

        for (name, toolset) in &doc.toolsets {
            match merged.toolsets.get_mut(name) {
                Some(existing) if options.merge_arrays => {
                    merge_toolset_arrays(existing, toolset);
                }
                _ => {
                    merged.toolsets.insert(name.clone(), toolset.clone());
                }
            }
        }

        for (key, value) in &doc.metadata {
            merged.metadata.insert(key.clone(), value.clone());
        }
    }

    Ok(merged)
}

fn merge_toolset_arrays(existing: &mut ToolsetDescriptor, incoming: &ToolsetDescriptor) {
    let mut seen: HashSet<String> = existing.tools.iter().cloned().collect();
    for tool in &incoming.tools {
        if seen.insert(tool.clone()) {
            existing.tools.push(tool.clone());
        }
    }
    if incoming.title.is_some() {
        existing.title = incoming.title.clone();
    }
    if incoming.description.is_some() {
        existing.description = incoming.description.clone();
    }
    for (key, value) in &incoming.metadata {
        existing.metadata.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{SourceDescriptor, ToolDescriptor, ToolSecurityPolicy};
    use std::collections::HashMap;

    fn source() -> SourceDescriptor {
        SourceDescriptor {
            host: "h".into(),
            user: "u".into(),
            password: "p".into(),
            port: None,
            ignore_unauthorized: true,
        }
    }

    fn tool(statement: &str) -> ToolDescriptor {
        ToolDescriptor {
            source: "s1".into(),
            description: "d".into(),
            statement: statement.into(),
            parameters: Vec::new(),
            domain: None,
            category: None,
            metadata: HashMap::new(),
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: false,
            open_world_hint: false,
            security: Some(ToolSecurityPolicy::default()),
        }
    }

    #[test]
    fn override_wins_when_duplicates_allowed() {
        let mut doc1 = RawDocument::default();
        doc1.sources.insert("s1".into(), source());
        doc1.tools.insert("usage_count".into(), tool("SELECT 1 FROM t1"));

        let mut doc2 = RawDocument::default();
        doc2.tools.insert("usage_count".into(), tool("SELECT 2 FROM t2"));

        let docs = vec![("doc1.yaml".to_string(), doc1), ("doc2.yaml".to_string(), doc2)];
        let options = MergeOptions {
            allow_duplicate_tools: true,
            ..Default::default()
        };
        let merged = merge_documents(&docs, options).unwrap();
        assert_eq!(merged.tools["usage_count"].statement, "SELECT 2 FROM t2");
    }

    #[test]
    fn duplicate_tool_rejected_by_default() {
        let mut doc1 = RawDocument::default();
        doc1.tools.insert("t".into(), tool("SELECT 1"));
        let mut doc2 = RawDocument::default();
        doc2.tools.insert("t".into(), tool("SELECT 2"));

        let docs = vec![("a.yaml".to_string(), doc1), ("b.yaml".to_string(), doc2)];
        let result = merge_documents(&docs, MergeOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn toolset_arrays_concat_and_dedup() {
        let mut doc1 = RawDocument::default();
        doc1.toolsets.insert(
            "fast".into(),
            ToolsetDescriptor {
                tools: vec!["a".into(), "b".into()],
                title: None,
                description: None,
                metadata: HashMap::new(),
            },
        );
        let mut doc2 = RawDocument::default();
        doc2.toolsets.insert(
            "fast".into(),
            ToolsetDescriptor {
                tools: vec!["b".into(), "c".into()],
                title: None,
                description: None,
                metadata: HashMap::new(),
            },
        );

        let docs = vec![("a.yaml".to_string(), doc1), ("b.yaml".to_string(), doc2)];
        let merged = merge_documents(&docs, MergeOptions::default()).unwrap();
        assert_eq!(merged.toolsets["fast"].tools, vec!["a", "b", "c"]);
    }
}
