// ABOUTME: Schema and cross-reference validation for raw and merged configuration
// ABOUTME: Collects every violation instead of stopping at the first (spec §4.1 step 3, 5)

//! Validation passes over [`RawDocument`] (per-entity shape) and
//! [`MergedConfig`] (cross-reference resolution).

use std::collections::HashSet;

use regex::Regex;

use super::schema::{MergedConfig, ParameterType, RawDocument, ToolDescriptor, ToolParameterDescriptor};

/// One validation failure, with enough context to locate it in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Validate a single parsed document's entity shapes, returning every
/// violation found (spec §4.1 step 3: "collect all errors, don't stop at
/// first").
#[must_use]
pub fn validate_document(doc: &RawDocument) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (name, source) in &doc.sources {
        if name.trim().is_empty() {
            issues.push(ValidationIssue::new("sources", "source name must not be empty"));
        }
        if source.host.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("sources.{name}.host"), "host must not be empty"));
        }
        if source.user.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("sources.{name}.user"), "user must not be empty"));
        }
    }

    for (name, tool) in &doc.tools {
        validate_tool(name, tool, &mut issues);
    }

    for (name, toolset) in &doc.toolsets {
        if toolset.tools.is_empty() {
            issues.push(ValidationIssue::new(
                format!("toolsets.{name}.tools"),
                "toolset must list at least one tool",
            ));
        }
    }

    issues
}

fn validate_tool(name: &str, tool: &ToolDescriptor, issues: &mut Vec<ValidationIssue>) {
    let prefix = format!("tools.{name}");

    if tool.description.trim().is_empty() {
        issues.push(ValidationIssue::new(format!("{prefix}.description"), "description must not be empty"));
    }
    if tool.statement.trim().is_empty() {
        issues.push(ValidationIssue::new(format!("{prefix}.statement"), "statement must not be empty"));
    }
    if tool.source.trim().is_empty() {
        issues.push(ValidationIssue::new(format!("{prefix}.source"), "source must not be empty"));
    }

    let mut seen_names = HashSet::new();
    for param in &tool.parameters {
        let param_prefix = format!("{prefix}.parameters.{}", param.name);
        if param.name.trim().is_empty() {
            issues.push(ValidationIssue::new(prefix.clone(), "parameter name must not be empty"));
            continue;
        }
        if !seen_names.insert(param.name.clone()) {
            issues.push(ValidationIssue::new(&param_prefix, "duplicate parameter name"));
        }
        validate_parameter(&param_prefix, param, issues);
    }

    // Placeholder cross-check and style-mixing is enforced by the binder at
    // compile time (it has access to the compiled parameter set and needs
    // the same scan logic); see tools::binder::detect_mode.
}

fn validate_parameter(prefix: &str, param: &ToolParameterDescriptor, issues: &mut Vec<ValidationIssue>) {
    if param.param_type == ParameterType::Array && param.item_type.is_none() {
        issues.push(ValidationIssue::new(prefix, "array parameter requires itemType"));
    }
    if param.param_type != ParameterType::Array && param.item_type.is_some() {
        issues.push(ValidationIssue::new(prefix, "itemType is only valid for array parameters"));
    }

    if let (Some(min), Some(max)) = (param.min, param.max) {
        if min > max {
            issues.push(ValidationIssue::new(prefix, "min must be <= max"));
        }
    }
    if let (Some(min_len), Some(max_len)) = (param.min_length, param.max_length) {
        if min_len > max_len {
            issues.push(ValidationIssue::new(prefix, "minLength must be <= maxLength"));
        }
    }

    if let Some(pattern) = &param.pattern {
        if Regex::new(pattern).is_err() {
            issues.push(ValidationIssue::new(prefix, format!("invalid regex pattern: {pattern}")));
        }
    }

    if let Some(enum_values) = &param.enum_values {
        if let Some(default) = &param.default {
            if !enum_values.contains(default) {
                issues.push(ValidationIssue::new(prefix, "default value is not a member of enum"));
            }
        }
    }
}

/// Cross-reference checks over the merged config (spec §4.1 step 5): every
/// tool's `source` exists, every toolset entry names an existing tool.
#[must_use]
pub fn validate_cross_references(config: &MergedConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (tool_name, tool) in &config.tools {
        if !config.sources.contains_key(&tool.source) {
            issues.push(ValidationIssue::new(
                format!("tools.{tool_name}.source"),
                format!("unknown source '{}'", tool.source),
            ));
        }
    }

    for (toolset_name, toolset) in &config.toolsets {
        for tool_name in &toolset.tools {
            if !config.tools.contains_key(tool_name) {
                issues.push(ValidationIssue::new(
                    format!("toolsets.{toolset_name}.tools"),
                    format!("unknown tool '{tool_name}'"),
                ));
            }
        }
    }

    if config.is_empty() {
        issues.push(ValidationIssue::new(
            "<root>",
            "at least one of sources/tools/toolsets must be non-empty after merge",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{SourceDescriptor, ToolSecurityPolicy};
    use std::collections::HashMap;

    fn sample_source() -> SourceDescriptor {
        SourceDescriptor {
            host: "h1".into(),
            user: "u".into(),
            password: "p".into(),
            port: None,
            ignore_unauthorized: true,
        }
    }

    fn sample_tool(source: &str) -> ToolDescriptor {
        ToolDescriptor {
            source: source.into(),
            description: "desc".into(),
            statement: "SELECT 1 FROM sysibm.sysdummy1".into(),
            parameters: Vec::new(),
            domain: None,
            category: None,
            metadata: HashMap::new(),
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: false,
            open_world_hint: false,
            security: Some(ToolSecurityPolicy::default()),
        }
    }

    #[test]
    fn array_parameter_without_item_type_is_rejected() {
        let param = ToolParameterDescriptor {
            name: "ids".into(),
            param_type: ParameterType::Array,
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
        };
        let mut issues = Vec::new();
        validate_parameter("tools.t.parameters.ids", &param, &mut issues);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("itemType"));
    }

    #[test]
    fn cross_reference_catches_unknown_source_and_tool() {
        let mut config = MergedConfig::default();
        config.sources.insert("s1".into(), sample_source());
        config.tools.insert("t1".into(), sample_tool("missing_source"));
        config.toolsets.insert(
            "ts1".into(),
            super::super::schema::ToolsetDescriptor {
                tools: vec!["missing_tool".into()],
                title: None,
                description: None,
                metadata: HashMap::new(),
            },
        );

        let issues = validate_cross_references(&config);
        assert!(issues.iter().any(|i| i.message.contains("missing_source")));
        assert!(issues.iter().any(|i| i.message.contains("missing_tool")));
    }

    #[test]
    fn empty_merged_config_is_rejected() {
        let config = MergedConfig::default();
        let issues = validate_cross_references(&config);
        assert!(issues.iter().any(|i| i.path == "<root>"));
    }
}
