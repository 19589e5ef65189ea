// ABOUTME: HTTP surface — auth issuance, health, admin reload, and the MCP-over-HTTP transport
// ABOUTME: Built as several stateless axum routers merged together (spec §6.1; SPEC_FULL §3 admin reload)

pub mod auth_routes;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::auth::{AuthSessionManager, KeyPair};
use crate::config::ConfigLoader;
use crate::db::SourcePoolManager;
use crate::mcp::transport_http;
use crate::mcp::ServerState;
use crate::tools::ToolRegistry;

/// Shared state for every non-MCP HTTP route.
pub struct HttpState {
    pub auth_manager: Option<Arc<AuthSessionManager>>,
    pub keypair: Option<Arc<KeyPair>>,
    pub allow_http: bool,
    pub config_loader: Arc<ConfigLoader>,
    pub registry: Arc<ToolRegistry>,
    pub pools: Arc<SourcePoolManager>,
    pub selected_toolsets: Vec<String>,
}

/// Assemble the full HTTP router: the MCP JSON-RPC transport at `/mcp`,
/// plus auth, health, and admin routes, each with its own state.
pub fn build_router(mcp_state: Arc<ServerState>, http_state: Arc<HttpState>) -> Router {
    let mcp_router = Router::new()
        .route("/mcp", post(transport_http::handle))
        .with_state(mcp_state);

    let rest_router = Router::new()
        .route("/api/v1/auth/public-key", get(auth_routes::public_key))
        .route("/api/v1/auth", post(auth_routes::issue_token))
        .route("/api/v1/toolsets", get(routes::toolsets))
        .route("/healthz", get(routes::healthz))
        .route("/api/v1/admin/reload", post(routes::reload))
        .with_state(http_state);

    Router::new().merge(mcp_router).merge(rest_router)
}
