// ABOUTME: Tool Compiler — turns a declarative ToolDescriptor into a callable CompiledTool
// ABOUTME: Wires binder -> security validator -> pool manager -> execution -> row conversion (spec §4.2)

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use sqlx::Column;
use sqlx::Row;

use crate::config::schema::{ToolDescriptor, ToolParameterDescriptor, ToolSecurityPolicy};
use crate::db::{row_to_json, SourcePoolManager};
use crate::errors::{AppError, AppResult};
use crate::mcp::schema::{JsonSchema, ToolAnnotations};
use crate::tools::context::ToolExecutionContext;
use crate::tools::param_schema::{build_input_schema, title_case, validate_input};
use crate::tools::result::{ResultMetadata, ToolInvocationResult};
use crate::tools::{binder, security};

/// Where `invoke_inner` should get its connection pool from, resolved only
/// after input validation, binding, and security checks all pass.
enum PoolSource<'a> {
    Manager(&'a SourcePoolManager),
    Resolved(sqlx::AnyPool),
}

/// A tool, ready to be listed in `tools/list` and invoked via `tools/call`.
#[derive(Debug)]
pub struct CompiledTool {
    pub name: String,
    pub description: String,
    pub input_schema: JsonSchema,
    pub annotations: ToolAnnotations,
    pub source: String,
    pub statement: String,
    pub parameters: Vec<ToolParameterDescriptor>,
    pub security: ToolSecurityPolicy,
    pub toolsets: Vec<String>,
}

impl CompiledTool {
    /// Compile `descriptor` into a [`CompiledTool`].
    ///
    /// # Errors
    /// Returns [`AppError::config`] when the statement mixes placeholder
    /// styles, or when it is a direct-substitution tool (statement is a
    /// single bare `:name`) without the mandatory `readOnly: true` and a
    /// non-empty `forbiddenKeywords` policy (spec §4.3 "Direct substitution",
    /// §9).
    pub fn compile(name: &str, descriptor: &ToolDescriptor, toolsets: Vec<String>) -> AppResult<Self> {
        binder::detect_mode(&descriptor.statement)
            .map_err(|e| AppError::config(format!("tool '{name}': {}", e.message)))?;

        let security = descriptor.security_or_default();

        if is_direct_substitution_shape(&descriptor.statement, &descriptor.parameters)
            && !(security.read_only && !security.forbidden_keywords.is_empty())
        {
            return Err(AppError::config(format!(
                "tool '{name}' uses direct SQL substitution and must declare \
                 security.readOnly: true with a non-empty forbiddenKeywords list"
            )));
        }

        let input_schema = build_input_schema(&descriptor.parameters);
        let annotations = ToolAnnotations {
            title: title_case(name),
            read_only_hint: descriptor.read_only_hint,
            destructive_hint: descriptor.destructive_hint,
            idempotent_hint: descriptor.idempotent_hint,
            open_world_hint: descriptor.open_world_hint,
            domain: descriptor.domain.clone(),
            category: descriptor.category.clone(),
            toolsets,
            custom_metadata: descriptor.metadata.clone(),
        };

        let toolsets = annotations.toolsets.clone();

        Ok(Self {
            name: name.to_owned(),
            description: descriptor.description.clone(),
            input_schema,
            annotations,
            source: descriptor.source.clone(),
            statement: descriptor.statement.clone(),
            parameters: descriptor.parameters.clone(),
            security,
            toolsets,
        })
    }

    /// Execute this tool against its declared source, validating input,
    /// binding parameters, and enforcing the SQL security policy before the
    /// Source Pool Manager ever dials a connection — a malformed or
    /// security-rejected call never reaches the network.
    pub async fn invoke(
        &self,
        pools: &SourcePoolManager,
        input: &Value,
        ctx: &ToolExecutionContext,
    ) -> ToolInvocationResult {
        self.run(PoolSource::Manager(pools), input, ctx).await
    }

    /// Execute this tool against an already-resolved pool, bypassing the
    /// Source Pool Manager. Used when an authenticated call routes to its
    /// per-token [`crate::auth::AuthPool`] instead (spec §4.6 "Routing").
    pub async fn invoke_with_pool(
        &self,
        pool: sqlx::AnyPool,
        input: &Value,
        ctx: &ToolExecutionContext,
    ) -> ToolInvocationResult {
        self.run(PoolSource::Resolved(pool), input, ctx).await
    }

    async fn run(
        &self,
        pool: PoolSource<'_>,
        input: &Value,
        ctx: &ToolExecutionContext,
    ) -> ToolInvocationResult {
        let start = Instant::now();
        match self.invoke_inner(pool, input).await {
            Ok((data, columns, column_types, binds_len, mode)) => {
                let row_count = data.len();
                ToolInvocationResult::success(
                    data,
                    columns,
                    ResultMetadata {
                        execution_time_ms: start.elapsed().as_millis(),
                        row_count: Some(row_count),
                        column_types: Some(column_types),
                        affected_rows: None,
                        parameter_binding_mode: format!("{mode:?}"),
                        parameter_count: binds_len,
                        request_id: Some(ctx.request_id.clone()),
                    },
                )
            }
            Err(e) => ToolInvocationResult::failure(
                e.message.clone(),
                ResultMetadata {
                    execution_time_ms: start.elapsed().as_millis(),
                    row_count: None,
                    column_types: None,
                    affected_rows: None,
                    parameter_binding_mode: "unknown".to_owned(),
                    parameter_count: 0,
                    request_id: Some(ctx.request_id.clone()),
                },
            ),
        }
    }

    #[allow(clippy::type_complexity)]
    async fn invoke_inner(
        &self,
        pool: PoolSource<'_>,
        input: &Value,
    ) -> AppResult<(Vec<Value>, Vec<String>, Vec<String>, usize, binder::BindMode)> {
        let effective = validate_input(input, &self.parameters)?;
        let supplied: HashMap<String, Value> = effective;

        let bound = binder::bind(&self.statement, &supplied, &self.parameters)?;
        security::validate(&bound.final_sql, &self.security)?;

        let pool = match pool {
            PoolSource::Manager(pools) => pools.pool(&self.source).await?,
            PoolSource::Resolved(pool) => pool,
        };

        let mut query = sqlx::query(&bound.final_sql);
        for value in &bound.binds {
            query = bind_json_value(query, value);
        }

        let rows = query.fetch_all(&pool).await.map_err(AppError::from)?;

        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_owned()).collect())
            .unwrap_or_default();
        let column_types = rows
            .first()
            .map(crate::db::column_metadata)
            .map(|meta| meta.into_iter().map(|m| m.type_name).collect())
            .unwrap_or_default();
        let data: Vec<Value> = rows.iter().map(row_to_json).collect();

        Ok((data, columns, column_types, bound.binds.len(), bound.mode))
    }
}

fn is_direct_substitution_shape(statement: &str, parameters: &[ToolParameterDescriptor]) -> bool {
    let [only] = parameters else { return false };
    only.param_type == crate::config::schema::ParameterType::String
        && statement.trim() == format!(":{}", only.name)
}

fn bind_json_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ParameterType, ToolDescriptor, ToolSecurityPolicy};

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

    #[test]
    fn direct_substitution_without_guardrails_fails_to_compile() {
        let descriptor = ToolDescriptor {
            source: "main".into(),
            description: "raw".into(),
            statement: ":raw_sql".into(),
            parameters: vec![string_param("raw_sql")],
            domain: None,
            category: None,
            metadata: HashMap::new(),
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: false,
            open_world_hint: false,
            security: Some(ToolSecurityPolicy {
                read_only: true,
                max_query_length: 1000,
                forbidden_keywords: Vec::new(),
            }),
        };
        let err = CompiledTool::compile("raw_tool", &descriptor, vec![]).unwrap_err();
        assert!(err.message.contains("direct SQL substitution"));
    }

    #[test]
    fn direct_substitution_with_guardrails_compiles() {
        let descriptor = ToolDescriptor {
            source: "main".into(),
            description: "raw".into(),
            statement: ":raw_sql".into(),
            parameters: vec![string_param("raw_sql")],
            domain: None,
            category: None,
            metadata: HashMap::new(),
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: false,
            open_world_hint: false,
            security: Some(ToolSecurityPolicy {
                read_only: true,
                max_query_length: 1000,
                forbidden_keywords: vec!["DROP".into()],
            }),
        };
        assert!(CompiledTool::compile("raw_tool", &descriptor, vec![]).is_ok());
    }

    #[test]
    fn mixed_placeholder_styles_fail_to_compile() {
        let descriptor = ToolDescriptor {
            source: "main".into(),
            description: "d".into(),
            statement: "SELECT * FROM t WHERE a = :a AND b = ?".into(),
            parameters: vec![string_param("a")],
            domain: None,
            category: None,
            metadata: HashMap::new(),
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: false,
            open_world_hint: false,
            security: None,
        };
        assert!(CompiledTool::compile("bad_tool", &descriptor, vec![]).is_err());
    }
}
