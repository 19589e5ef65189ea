// ABOUTME: End-to-end Tool Compiler + SQL Security Validator scenarios (spec §8)
// ABOUTME: No live database is dialed: rejected calls fail before the Source Pool Manager connects

use std::collections::HashMap;

use ibmi_mcp_server::config::schema::{
    MergedConfig, ParameterType, SourceDescriptor, ToolDescriptor, ToolParameterDescriptor,
    ToolSecurityPolicy,
};
use ibmi_mcp_server::db::SourcePoolManager;
use ibmi_mcp_server::errors::ErrorCode;
use ibmi_mcp_server::tools::{compile_all, ToolExecutionContext};
use serde_json::json;

fn source() -> SourceDescriptor {
    SourceDescriptor {
        host: "unreachable.invalid".into(),
        user: "u".into(),
        password: "p".into(),
        port: None,
        ignore_unauthorized: true,
    }
}

fn int_param(name: &str) -> ToolParameterDescriptor {
    ToolParameterDescriptor {
        name: name.into(),
        param_type: ParameterType::Integer,
        item_type: None,
        description: None,
        default: None,
        required: Some(true),
        min: None,
        max: None,
        min_length: None,
        max_length: None,
        enum_values: None,
        pattern: None,
    }
}

fn string_param(name: &str) -> ToolParameterDescriptor {
    ToolParameterDescriptor {
        name: name.into(),
        param_type: ParameterType::String,
        item_type: None,
        description: None,
        default: None,
        required: Some(true),
        min: None,
        max: None,
        min_length: None,
        max_length: None,
        enum_values: None,
        pattern: None,
    }
}

fn config_with_tool(name: &str, tool: ToolDescriptor) -> MergedConfig {
    let mut config = MergedConfig::default();
    config.sources.insert("main".into(), source());
    config.tools.insert(name.into(), tool);
    config
}

/// A forbidden-keyword violation is caught before the Source Pool Manager
/// ever dials a connection: the pool here is declared but never used, so a
/// real network attempt would hang/err rather than fail fast if the
/// ordering regressed.
#[tokio::test]
async fn forbidden_keyword_rejected_without_dialing_pool() {
    let tool = ToolDescriptor {
        source: "main".into(),
        description: "deletes a customer".into(),
        statement: "DELETE FROM customers WHERE id = :id".into(),
        parameters: vec![int_param("id")],
        domain: None,
        category: None,
        metadata: HashMap::new(),
        read_only_hint: false,
        destructive_hint: true,
        idempotent_hint: false,
        open_world_hint: false,
        security: Some(ToolSecurityPolicy {
            read_only: false,
            forbidden_keywords: vec!["DELETE".into()],
            ..ToolSecurityPolicy::default()
        }),
    };
    let config = config_with_tool("delete_customer", tool);
    let (tools, _index) = compile_all(&config).unwrap();
    let compiled = tools.into_iter().find(|t| t.name == "delete_customer").unwrap();

    let pools = SourcePoolManager::new(config.sources.clone());
    let ctx = ToolExecutionContext::new("delete_customer");
    let result = compiled.invoke(&pools, &json!({ "id": 7 }), &ctx).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Forbidden keyword"));
}

/// Direct SQL substitution without the mandatory read-only + forbidden
/// keyword guardrails must fail at compile time, never at invocation.
#[test]
fn direct_substitution_without_guardrails_is_rejected_at_compile_time() {
    let tool = ToolDescriptor {
        source: "main".into(),
        description: "raw report".into(),
        statement: ":raw_sql".into(),
        parameters: vec![string_param("raw_sql")],
        domain: None,
        category: None,
        metadata: HashMap::new(),
        read_only_hint: true,
        destructive_hint: false,
        idempotent_hint: false,
        open_world_hint: false,
        security: None,
    };
    let config = config_with_tool("ad_hoc_report", tool);
    let err = compile_all(&config).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(err.message.contains("ad_hoc_report"));
}

/// Missing a required parameter is caught by input validation, again
/// before any pool is dialed.
#[tokio::test]
async fn missing_required_parameter_rejected_without_dialing_pool() {
    let tool = ToolDescriptor {
        source: "main".into(),
        description: "look up a customer".into(),
        statement: "SELECT * FROM customers WHERE id = :id".into(),
        parameters: vec![int_param("id")],
        domain: None,
        category: None,
        metadata: HashMap::new(),
        read_only_hint: true,
        destructive_hint: false,
        idempotent_hint: false,
        open_world_hint: false,
        security: Some(ToolSecurityPolicy::default()),
    };
    let config = config_with_tool("get_customer", tool);
    let (tools, _index) = compile_all(&config).unwrap();
    let compiled = tools.into_iter().find(|t| t.name == "get_customer").unwrap();

    let pools = SourcePoolManager::new(config.sources.clone());
    let ctx = ToolExecutionContext::new("get_customer");
    let result = compiled.invoke(&pools, &json!({}), &ctx).await;

    assert!(!result.success);
}
