// ABOUTME: Tool Registration Cache — holds the currently-live compiled tool set
// ABOUTME: Swapped atomically on reload so an in-flight tools/call never sees a half-updated set

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;

use crate::tools::compiler::CompiledTool;
use crate::tools::toolset_index::{ToolsetIndex, ToolsetSummary};

/// Build statistics recorded each time the registry is (re)populated.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildStats {
    pub tool_count: usize,
    pub toolset_count: usize,
    pub build_duration_ms: u128,
}

struct Snapshot {
    tools: Vec<Arc<CompiledTool>>,
    index: ToolsetIndex,
    stats: BuildStats,
}

/// Holds the active set of compiled tools behind an atomically-swapped
/// pointer, so readers (the MCP dispatch loop) never block a writer (a
/// config reload) and vice versa.
pub struct ToolRegistry {
    current: ArcSwap<Snapshot>,
}

impl ToolRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                tools: Vec::new(),
                index: ToolsetIndex::default(),
                stats: BuildStats {
                    tool_count: 0,
                    toolset_count: 0,
                    build_duration_ms: 0,
                },
            }),
        }
    }

    /// Replace the live tool set. Readers that already hold a snapshot via
    /// [`Self::tools`]/[`Self::get`] keep seeing the old set until they ask
    /// again; there is no partially-updated state visible to any reader.
    pub fn swap(&self, tools: Vec<CompiledTool>, index: ToolsetIndex) {
        let start = Instant::now();
        let tool_count = tools.len();
        let toolset_count = index.toolset_count();
        let snapshot = Snapshot {
            tools: tools.into_iter().map(Arc::new).collect(),
            index,
            stats: BuildStats {
                tool_count,
                toolset_count,
                build_duration_ms: start.elapsed().as_millis(),
            },
        };
        tracing::info!(
            tool_count,
            toolset_count,
            "registered tool set"
        );
        self.current.store(Arc::new(snapshot));
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Arc<CompiledTool>> {
        self.current.load().tools.clone()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<CompiledTool>> {
        self.current.load().tools.iter().find(|t| t.name == name).cloned()
    }

    #[must_use]
    pub fn stats(&self) -> BuildStats {
        self.current.load().stats.clone()
    }

    /// Toolset summaries for the currently-live set, as reported by
    /// `--list-toolsets` and `GET /api/v1/toolsets` (SPEC_FULL §3).
    #[must_use]
    pub fn toolset_summaries(&self) -> Vec<ToolsetSummary> {
        self.current.load().index.summaries().to_vec()
    }

    /// Tools visible under the given selected-toolsets filter (spec §4.8).
    /// An empty filter means "no restriction" and returns every tool.
    #[must_use]
    pub fn tools_for_toolsets(&self, selected: &[String]) -> Vec<Arc<CompiledTool>> {
        if selected.is_empty() {
            return self.tools();
        }
        let snapshot = self.current.load();
        let allowed = snapshot.index.tool_names_for(selected);
        snapshot
            .tools
            .iter()
            .filter(|t| allowed.contains(&t.name))
            .cloned()
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
