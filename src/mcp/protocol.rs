// ABOUTME: MCP method handlers — initialize, ping, tools/list, tools/call
// ABOUTME: Transport-agnostic; stdio and HTTP both dispatch through ServerState::handle (spec §6)

use std::sync::Arc;

use serde_json::Value;

use crate::auth::AuthSessionManager;
use crate::db::SourcePoolManager;
use crate::errors::AppError;
use crate::mcp::jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::schema::{
    InitializeRequest, InitializeResponse, ServerInfo, ToolCall, ToolSchema, SERVER_NAME,
    SERVER_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::tools::{to_tool_call_response, ToolExecutionContext, ToolRegistry};

/// Everything a single MCP method handler needs: the live tool registry,
/// the default Source Pool Manager, and (when auth is enabled) the Auth
/// Session Manager used to route bearer-token calls to per-token pools.
pub struct ServerState {
    pub registry: Arc<ToolRegistry>,
    pub pools: Arc<SourcePoolManager>,
    pub auth: Option<Arc<AuthSessionManager>>,
    pub selected_toolsets: Vec<String>,
}

/// Dispatch one JSON-RPC request to the matching MCP method handler.
/// `bearer_token` comes from the transport (an `Authorization: Bearer`
/// header over HTTP; absent over stdio).
pub async fn dispatch(
    state: &ServerState,
    request: JsonRpcRequest,
    bearer_token: Option<&str>,
) -> JsonRpcResponse {
    match request.method.as_str() {
        "initialize" => handle_initialize(request),
        "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
        "tools/list" => handle_tools_list(state, request),
        "tools/call" => handle_tools_call(state, request, bearer_token).await,
        other => JsonRpcResponse::error(
            request.id,
            error_codes::METHOD_NOT_FOUND,
            format!("unknown method '{other}'"),
        ),
    }
}

fn handle_initialize(request: JsonRpcRequest) -> JsonRpcResponse {
    let init_request: InitializeRequest = request
        .params
        .as_ref()
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default();

    let negotiated = init_request
        .protocol_version
        .as_deref()
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
        .to_owned();

    let response = InitializeResponse {
        protocol_version: negotiated,
        server_info: ServerInfo {
            name: SERVER_NAME.to_owned(),
            version: SERVER_VERSION.to_owned(),
        },
    };

    match serde_json::to_value(response) {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(e) => JsonRpcResponse::error(request.id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

fn handle_tools_list(state: &ServerState, request: JsonRpcRequest) -> JsonRpcResponse {
    let tools: Vec<ToolSchema> = state
        .registry
        .tools_for_toolsets(&state.selected_toolsets)
        .into_iter()
        .map(|tool| ToolSchema {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
            annotations: Some(tool.annotations.clone()),
        })
        .collect();

    JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
}

async fn handle_tools_call(
    state: &ServerState,
    request: JsonRpcRequest,
    bearer_token: Option<&str>,
) -> JsonRpcResponse {
    let Some(params) = request.params.clone() else {
        return JsonRpcResponse::error(request.id, error_codes::INVALID_PARAMS, "missing params");
    };
    let call: ToolCall = match serde_json::from_value(params) {
        Ok(c) => c,
        Err(e) => {
            return JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_PARAMS,
                format!("invalid tools/call params: {e}"),
            )
        }
    };

    let Some(tool) = state.registry.get(&call.name) else {
        return JsonRpcResponse::error(
            request.id,
            error_codes::METHOD_NOT_FOUND,
            format!("unknown tool '{}'", call.name),
        );
    };

    let mut ctx = ToolExecutionContext::new(call.name.clone());
    if let Some(token) = bearer_token {
        ctx = ctx.with_bearer_token(token);
    }
    let input = call.arguments.unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    let result = if let Some(token) = bearer_token {
        match route_to_auth_pool(state, token).await {
            Ok(pool) => tool.invoke_with_pool(pool, &input, &ctx).await,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    e.message,
                )
            }
        }
    } else {
        tool.invoke(&state.pools, &input, &ctx).await
    };

    let response = to_tool_call_response(&result);
    match serde_json::to_value(response) {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(e) => JsonRpcResponse::error(request.id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

async fn route_to_auth_pool(state: &ServerState, token: &str) -> Result<sqlx::AnyPool, AppError> {
    let auth = state
        .auth
        .as_ref()
        .ok_or_else(|| AppError::unauthorized("authenticated mode is not enabled"))?;
    let auth_pool = auth.validate(token)?;
    Ok(auth_pool.pool.clone())
}
