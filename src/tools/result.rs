// ABOUTME: The shape every tool invocation returns, success or failure (spec §4.9)
// ABOUTME: `metadata` carries execution diagnostics that survive into structuredContent

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single tool invocation, before it is split into the MCP
/// `content`/`structuredContent` halves by the runtime adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResultMetadata,
}

/// Execution diagnostics attached to every invocation outcome, success or
/// failure (spec §4.9, supplemented with `request_id` in SPEC_FULL §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(rename = "executionTimeMs")]
    pub execution_time_ms: u128,
    #[serde(rename = "rowCount", skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(rename = "columnTypes", skip_serializing_if = "Option::is_none")]
    pub column_types: Option<Vec<String>>,
    #[serde(rename = "affectedRows", skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(rename = "parameterBindingMode")]
    pub parameter_binding_mode: String,
    #[serde(rename = "parameterCount")]
    pub parameter_count: usize,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ToolInvocationResult {
    #[must_use]
    pub fn success(data: Vec<Value>, columns: Vec<String>, metadata: ResultMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            columns: Some(columns),
            error: None,
            metadata,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>, metadata: ResultMetadata) -> Self {
        Self {
            success: false,
            data: None,
            columns: None,
            error: Some(error.into()),
            metadata,
        }
    }
}
