// ABOUTME: End-to-end MCP JSON-RPC dispatch scenarios over a real compiled tool set (spec §8)
// ABOUTME: Exercises initialize/tools.list/tools.call without a live Db2-for-i connection

use std::io::Write;
use std::sync::Arc;

use ibmi_mcp_server::config::{ConfigLoader, MergeOptions, SourceSpecifier};
use ibmi_mcp_server::db::SourcePoolManager;
use ibmi_mcp_server::mcp::jsonrpc::{error_codes, JsonRpcRequest};
use ibmi_mcp_server::mcp::{dispatch, ServerState};
use ibmi_mcp_server::tools::{compile_all, filter_for_toolsets, ToolRegistry};
use serde_json::json;

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

async fn test_state(toolset_filter: Vec<String>) -> (ServerState, tempfile::TempDir) {
    test_state_with_yaml(
        toolset_filter,
        r"
sources:
  main: { host: h, user: u, password: p }
tools:
  list_open_orders:
    source: main
    description: List open orders for a customer.
    statement: 'SELECT order_id FROM sales.orders WHERE customer_id = :customer_id'
    parameters:
      - { name: customer_id, type: integer }
toolsets:
  sales:
    tools: [list_open_orders]
",
    )
    .await
}

/// Build a [`ServerState`] the same way `bin/server.rs` does at startup:
/// compile every tool, then filter down to `toolset_filter` *before* the
/// registry swap, so `tools/call` on a tool outside the selection can
/// never reach `registry.get` in the first place (spec §4.8).
async fn test_state_with_yaml(toolset_filter: Vec<String>, yaml: &str) -> (ServerState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tools.yaml", yaml);
    let specs = vec![SourceSpecifier::File { path, required: true }];
    let loader = ConfigLoader::new(specs, MergeOptions::default());
    let config = loader.load().unwrap();
    let (tools, index) = compile_all(&config).unwrap();
    let tools = filter_for_toolsets(tools, &index, &toolset_filter);

    let registry = Arc::new(ToolRegistry::empty());
    registry.swap(tools, index);

    let pools = Arc::new(SourcePoolManager::new(config.sources.clone()));

    let state = ServerState {
        registry,
        pools,
        auth: None,
        selected_toolsets: toolset_filter,
    };
    (state, dir)
}

fn request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".into(),
        method: method.into(),
        params,
        id: Some(json!(1)),
    }
}

#[tokio::test]
async fn initialize_negotiates_a_supported_protocol_version() {
    let (state, _dir) = test_state(vec![]).await;
    let response = dispatch(&state, request("initialize", Some(json!({ "protocolVersion": "bogus" }))), None).await;
    let result = response.result.unwrap();
    assert!(result["protocolVersion"].as_str().is_some());
}

#[tokio::test]
async fn tools_list_reports_the_compiled_tool() {
    let (state, _dir) = test_state(vec![]).await;
    let response = dispatch(&state, request("tools/list", None), None).await;
    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "list_open_orders");
}

#[tokio::test]
async fn tools_list_honors_selected_toolsets_filter() {
    let (state, _dir) = test_state(vec!["nonexistent-toolset".into()]).await;
    let response = dispatch(&state, request("tools/list", None), None).await;
    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert!(tools.is_empty());
}

#[tokio::test]
async fn tools_call_on_a_tool_outside_the_selected_toolset_is_method_not_found() {
    // spec §8 scenario 6: toolsets fast=[a,b], slow=[c]; launched with
    // --toolsets fast, invoking c must return "tool not found" because it
    // was never registered, not merely hidden from tools/list.
    let yaml = r"
sources:
  main: { host: h, user: u, password: p }
tools:
  tool_a:
    source: main
    description: Tool A.
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
  tool_b:
    source: main
    description: Tool B.
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
  tool_c:
    source: main
    description: Tool C.
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
toolsets:
  fast:
    tools: [tool_a, tool_b]
  slow:
    tools: [tool_c]
";
    let (state, _dir) = test_state_with_yaml(vec!["fast".into()], yaml).await;

    let list_response = dispatch(&state, request("tools/list", None), None).await;
    let names: Vec<String> = list_response.result.unwrap()["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, vec!["tool_a".to_owned(), "tool_b".to_owned()]);

    let call = request("tools/call", Some(json!({ "name": "tool_c", "arguments": {} })));
    let response = dispatch(&state, call, None).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn tools_call_on_unknown_tool_is_method_not_found() {
    let (state, _dir) = test_state(vec![]).await;
    let call = request("tools/call", Some(json!({ "name": "does_not_exist", "arguments": {} })));
    let response = dispatch(&state, call, None).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn tools_call_with_bearer_token_but_no_auth_manager_is_rejected() {
    let (state, _dir) = test_state(vec![]).await;
    let call = request(
        "tools/call",
        Some(json!({ "name": "list_open_orders", "arguments": { "customer_id": 1 } })),
    );
    let response = dispatch(&state, call, Some("some-bearer-token")).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::INVALID_PARAMS);
    assert!(error.message.contains("authenticated mode is not enabled"));
}

#[tokio::test]
async fn tools_call_with_bad_input_returns_an_error_envelope_not_a_transport_error() {
    let (state, _dir) = test_state(vec![]).await;
    let call = request(
        "tools/call",
        Some(json!({ "name": "list_open_orders", "arguments": {} })),
    );
    let response = dispatch(&state, call, None).await;
    // A rejected tool invocation (missing required parameter) is still a
    // successful JSON-RPC response carrying an MCP-level error payload.
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));
}

#[tokio::test]
async fn unknown_method_is_rejected() {
    let (state, _dir) = test_state(vec![]).await;
    let response = dispatch(&state, request("not/a/real/method", None), None).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
}
