// ABOUTME: Tool compilation and invocation pipeline — schema, binding, security, execution
// ABOUTME: Entry points are `compiler::CompiledTool::compile` and `registry::ToolRegistry` (spec §4.2-§4.9)

pub mod adapter;
pub mod binder;
pub mod compiler;
pub mod context;
pub mod param_schema;
pub mod registry;
pub mod result;
pub mod security;
pub mod toolset_index;

pub use adapter::to_tool_call_response;
pub use compiler::CompiledTool;
pub use context::ToolExecutionContext;
pub use registry::{BuildStats, ToolRegistry};
pub use result::{ResultMetadata, ToolInvocationResult};
pub use toolset_index::{ToolsetIndex, ToolsetSummary};

use std::collections::HashMap;

use crate::config::schema::MergedConfig;
use crate::config::ConfigLoader;
use crate::db::SourcePoolManager;
use crate::errors::AppResult;

/// Compile every tool declared in `config` and build its toolset index.
/// Collects every failing tool's error rather than stopping at the first,
/// mirroring the config loader's "report everything" behavior.
///
/// # Errors
/// Returns [`crate::errors::AppError::config`] summarizing every tool that
/// failed to compile.
pub fn compile_all(config: &MergedConfig) -> AppResult<(Vec<CompiledTool>, ToolsetIndex)> {
    let index = ToolsetIndex::build(config);
    let mut compiled = Vec::with_capacity(config.tools.len());
    let mut errors: HashMap<String, String> = HashMap::new();

    let mut names: Vec<&String> = config.tools.keys().collect();
    names.sort();

    for name in names {
        let descriptor = &config.tools[name];
        let toolsets = index.toolsets_for_tool(name).to_vec();
        match CompiledTool::compile(name, descriptor, toolsets) {
            Ok(tool) => compiled.push(tool),
            Err(e) => {
                errors.insert(name.clone(), e.message);
            }
        }
    }

    if errors.is_empty() {
        Ok((compiled, index))
    } else {
        Err(crate::errors::AppError::config(format!(
            "{} tool(s) failed to compile: {}",
            errors.len(),
            errors
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("; ")
        )))
    }
}

/// Filter `tools` down to those whose toolset membership intersects
/// `selected` — "the registration cache registers only those compiled
/// tools whose membership intersects the filter" (spec §4.8). An empty
/// filter means no restriction and every tool passes through.
#[must_use]
pub fn filter_for_toolsets(
    tools: Vec<CompiledTool>,
    index: &ToolsetIndex,
    selected: &[String],
) -> Vec<CompiledTool> {
    if selected.is_empty() {
        return tools;
    }
    let allowed = index.tool_names_for(selected);
    tools.into_iter().filter(|t| allowed.contains(&t.name)).collect()
}

/// Re-resolve `config_loader`'s sources, recompile every tool, filter it
/// down to `selected_toolsets`, and atomically swap `registry` and `pools`
/// onto the new set. Shared by the admin reload HTTP route and the config
/// file watcher's reload consumer (spec §4.1 step 6, §4.7 atomicity).
///
/// # Errors
/// Propagates [`crate::errors::AppError::config`] from loading or
/// compiling; the registry and pools are left untouched on failure.
pub async fn reload_registry(
    config_loader: &ConfigLoader,
    pools: &SourcePoolManager,
    registry: &ToolRegistry,
    selected_toolsets: &[String],
) -> AppResult<(usize, usize)> {
    let config = config_loader.load()?;
    let (tools, index) = compile_all(&config)?;
    let tools = filter_for_toolsets(tools, &index, selected_toolsets);

    let tool_count = tools.len();
    let toolset_count = index.toolset_count();

    pools.replace_sources(config.sources.clone());
    registry.swap(tools, index);

    Ok((tool_count, toolset_count))
}
