// ABOUTME: YAML-facing data model for sources, tools, toolsets, and merged configuration
// ABOUTME: Mirrors the wire format in spec §6.2, deserialized with serde before validation

//! Declarative configuration entities (spec §3, §6.2).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An upstream database endpoint (spec §3 `SourceDescriptor`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDescriptor {
    pub host: String,
    pub user: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "ignore-unauthorized", default = "default_true")]
    pub ignore_unauthorized: bool,
}

const fn default_true() -> bool {
    true
}

/// The declared type of a tool parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Float,
    Boolean,
    Array,
}

impl ParameterType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Integer | Self::Float)
    }
}

/// A typed input slot of a tool (spec §3 `ToolParameterDescriptor`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(rename = "itemType", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ParameterType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ToolParameterDescriptor {
    /// Whether the parameter must be supplied by the caller (no default, not
    /// explicitly optional).
    #[must_use]
    pub fn is_required(&self) -> bool {
        if let Some(required) = self.required {
            return required && self.default.is_none();
        }
        self.default.is_none()
    }
}

/// Per-tool guardrails (spec §3 `ToolSecurityPolicy`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSecurityPolicy {
    #[serde(rename = "readOnly", default = "default_true")]
    pub read_only: bool,
    #[serde(rename = "maxQueryLength", default = "default_max_query_length")]
    pub max_query_length: usize,
    #[serde(rename = "forbiddenKeywords", default)]
    pub forbidden_keywords: Vec<String>,
}

const fn default_max_query_length() -> usize {
    crate::constants::defaults::MAX_QUERY_LENGTH
}

impl Default for ToolSecurityPolicy {
    fn default() -> Self {
        Self {
            read_only: true,
            max_query_length: default_max_query_length(),
            forbidden_keywords: Vec::new(),
        }
    }
}

/// A callable tool (spec §3 `ToolDescriptor`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub source: String,
    pub description: String,
    pub statement: String,
    #[serde(default)]
    pub parameters: Vec<ToolParameterDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(rename = "readOnlyHint", default = "default_true")]
    pub read_only_hint: bool,
    #[serde(rename = "destructiveHint", default)]
    pub destructive_hint: bool,
    #[serde(rename = "idempotentHint", default)]
    pub idempotent_hint: bool,
    #[serde(rename = "openWorldHint", default)]
    pub open_world_hint: bool,
    #[serde(default)]
    pub security: Option<ToolSecurityPolicy>,
}

impl ToolDescriptor {
    #[must_use]
    pub fn security_or_default(&self) -> ToolSecurityPolicy {
        self.security.clone().unwrap_or_default()
    }
}

/// A named group of tool names (spec §3 `ToolsetDescriptor`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsetDescriptor {
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// One parsed YAML document, prior to merging (spec §6.2 top-level keys).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub sources: HashMap<String, SourceDescriptor>,
    #[serde(default)]
    pub tools: HashMap<String, ToolDescriptor>,
    #[serde(default)]
    pub toolsets: HashMap<String, ToolsetDescriptor>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawDocument {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.tools.is_empty() && self.toolsets.is_empty()
    }
}

/// The result of merging all loaded documents (spec §3 `MergedConfig`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedConfig {
    pub sources: HashMap<String, SourceDescriptor>,
    pub tools: HashMap<String, ToolDescriptor>,
    pub toolsets: HashMap<String, ToolsetDescriptor>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MergedConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.tools.is_empty() && self.toolsets.is_empty()
    }
}
