// ABOUTME: Forward/reverse lookup between toolsets and the tool names they contain
// ABOUTME: Backs the --toolsets / --list-toolsets CLI flags and selected-toolsets filtering (spec §4.8)

use std::collections::{HashMap, HashSet};

use crate::config::schema::MergedConfig;

/// One toolset's display metadata, reported by `--list-toolsets` and the
/// supplemented `GET /api/v1/toolsets` surface (SPEC_FULL §3).
#[derive(Debug, Clone)]
pub struct ToolsetSummary {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tool_count: usize,
}

/// Forward (toolset -> tool names) and reverse (tool -> toolsets) indices
/// built once per config load/reload.
#[derive(Debug, Clone, Default)]
pub struct ToolsetIndex {
    forward: HashMap<String, Vec<String>>,
    reverse: HashMap<String, Vec<String>>,
    summaries: Vec<ToolsetSummary>,
}

impl ToolsetIndex {
    #[must_use]
    pub fn build(config: &MergedConfig) -> Self {
        let mut forward = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();
        let mut summaries = Vec::new();

        for (name, toolset) in &config.toolsets {
            forward.insert(name.clone(), toolset.tools.clone());
            summaries.push(ToolsetSummary {
                name: name.clone(),
                title: toolset.title.clone(),
                description: toolset.description.clone(),
                tool_count: toolset.tools.len(),
            });
            for tool_name in &toolset.tools {
                reverse.entry(tool_name.clone()).or_default().push(name.clone());
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));

        Self { forward, reverse, summaries }
    }

    #[must_use]
    pub fn toolset_count(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn toolsets_for_tool(&self, tool_name: &str) -> &[String] {
        self.reverse.get(tool_name).map_or(&[], Vec::as_slice)
    }

    /// Union of tool names declared across every selected toolset. A
    /// selected name that does not exist as a toolset contributes nothing
    /// (the config-level cross-reference check already caught unknown
    /// toolset names named in `--toolsets` during startup validation).
    #[must_use]
    pub fn tool_names_for(&self, selected: &[String]) -> HashSet<String> {
        let mut out = HashSet::new();
        for name in selected {
            if let Some(tools) = self.forward.get(name) {
                out.extend(tools.iter().cloned());
            }
        }
        out
    }

    #[must_use]
    pub fn summaries(&self) -> &[ToolsetSummary] {
        &self.summaries
    }
}
