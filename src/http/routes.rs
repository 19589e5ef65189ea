// ABOUTME: Health and admin-reload HTTP endpoints (SPEC_FULL §3 ambient operability surface)
// ABOUTME: Reload rebuilds the compiled-tool map fully before the atomic registry swap (spec §4.7)

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::db::HealthStatus;
use crate::errors::AppResult;
use crate::http::HttpState;
use crate::tools::reload_registry;

#[derive(Debug, Serialize)]
pub struct HealthzResponse {
    pub status: &'static str,
    pub sources: std::collections::HashMap<String, SourceHealthView>,
    pub tools: crate::tools::BuildStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_sessions: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SourceHealthView {
    pub status: HealthStatus,
    pub last_error: Option<String>,
}

/// `GET /healthz` — overall process liveness plus per-source health. Does
/// not dial a source that has never been used by a tool invocation.
pub async fn healthz(State(state): State<Arc<HttpState>>) -> Json<HealthzResponse> {
    let mut sources = std::collections::HashMap::new();
    for name in state.pools.declared_sources() {
        let health = state.pools.check_health(&name).await;
        sources.insert(
            name,
            SourceHealthView {
                status: health.status,
                last_error: health.last_error,
            },
        );
    }

    Json(HealthzResponse {
        status: "ok",
        sources,
        tools: state.registry.stats(),
        active_sessions: state.auth_manager.as_ref().map(|m| m.active_sessions()),
    })
}

#[derive(Debug, Serialize)]
pub struct ToolsetView {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "toolCount")]
    pub tool_count: usize,
}

/// `GET /api/v1/toolsets` — list the currently-live toolsets, for HTTP
/// clients that have no equivalent of the stdio-launch `--list-toolsets`
/// flag (SPEC_FULL §3).
pub async fn toolsets(State(state): State<Arc<HttpState>>) -> Json<Vec<ToolsetView>> {
    let views = state
        .registry
        .toolset_summaries()
        .into_iter()
        .map(|s| ToolsetView {
            name: s.name,
            title: s.title,
            description: s.description,
            tool_count: s.tool_count,
        })
        .collect();
    Json(views)
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub tool_count: usize,
    pub toolset_count: usize,
}

/// `POST /api/v1/admin/reload` — reload and re-merge the YAML configuration,
/// recompile every tool, and atomically swap the tool registry. The Source
/// Pool Manager's source set is diffed in the same pass so unchanged pools
/// stay connected (spec §4.7 atomicity, §4.5 "Swap in a new source set").
pub async fn reload(State(state): State<Arc<HttpState>>) -> AppResult<Json<ReloadResponse>> {
    let (tool_count, toolset_count) =
        reload_registry(&state.config_loader, &state.pools, &state.registry, &state.selected_toolsets).await?;

    tracing::info!(tool_count, toolset_count, "config reloaded");

    Ok(Json(ReloadResponse { tool_count, toolset_count }))
}
