// ABOUTME: MCP-over-HTTP transport — POST /mcp carries one JSON-RPC request per body (spec §6.1)
// ABOUTME: Bearer tokens arrive via the standard Authorization header and route to per-token pools

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::mcp::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::protocol::{dispatch, ServerState};

/// `POST /mcp` handler: dispatch a single JSON-RPC request, extracting the
/// bearer token (if any) from `Authorization: Bearer <token>`.
pub async fn handle(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    let bearer_token = bearer_token_from_headers(&headers);
    let response = dispatch(&state, request, bearer_token.as_deref()).await;
    Json(response)
}

fn bearer_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_owned)
}
