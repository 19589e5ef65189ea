// ABOUTME: Builds a JSON input schema from declared tool parameters and validates supplied input
// ABOUTME: Strict typing — no implicit coercion across string/number/boolean (spec §4.2 step 1)

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::config::schema::{ParameterType, ToolParameterDescriptor};
use crate::errors::AppError;
use crate::mcp::schema::{JsonSchema, PropertySchema};

fn json_type_name(t: ParameterType) -> &'static str {
    match t {
        ParameterType::String => "string",
        ParameterType::Number | ParameterType::Integer | ParameterType::Float => "number",
        ParameterType::Boolean => "boolean",
        ParameterType::Array => "array",
    }
}

/// Build the JSON Schema object advertised for a tool's input (spec §4.2 step 1).
#[must_use]
pub fn build_input_schema(parameters: &[ToolParameterDescriptor]) -> JsonSchema {
    let mut properties = HashMap::new();
    let mut required = Vec::new();

    for param in parameters {
        let items = param.item_type.map(|it| {
            Box::new(PropertySchema {
                property_type: json_type_name(it).to_owned(),
                items: None,
                description: None,
                default: None,
                minimum: None,
                maximum: None,
                min_length: None,
                max_length: None,
                enum_values: None,
                pattern: None,
            })
        });

        properties.insert(
            param.name.clone(),
            PropertySchema {
                property_type: json_type_name(param.param_type).to_owned(),
                items,
                description: param.description.clone(),
                default: param.default.clone(),
                minimum: param.min,
                maximum: param.max,
                min_length: param.min_length,
                max_length: param.max_length,
                enum_values: param.enum_values.clone(),
                pattern: param.pattern.clone(),
            },
        );

        if param.is_required() {
            required.push(param.name.clone());
        }
    }

    JsonSchema {
        schema_type: "object".to_owned(),
        properties: Some(properties),
        required: if required.is_empty() { None } else { Some(required) },
    }
}

/// Validate `input` (the raw caller-supplied object) against `parameters`,
/// returning the effective values (defaults substituted for omitted,
/// optional parameters). Strict typing: a string `"5"` does not satisfy a
/// `number` parameter, and vice versa.
///
/// # Errors
/// Returns [`AppError::validation`] naming the first failing parameter's
/// constraint violation.
pub fn validate_input(
    input: &Value,
    parameters: &[ToolParameterDescriptor],
) -> Result<HashMap<String, Value>, AppError> {
    let obj = input.as_object().ok_or_else(|| AppError::validation("tool input must be a JSON object"))?;

    let mut effective = HashMap::new();

    for param in parameters {
        let supplied = obj.get(&param.name);
        let value = match supplied {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                if let Some(default) = &param.default {
                    default.clone()
                } else if param.is_required() {
                    return Err(AppError::validation(format!(
                        "missing required parameter '{}'",
                        param.name
                    )));
                } else {
                    continue;
                }
            }
        };

        validate_value(param, &value)?;
        effective.insert(param.name.clone(), value);
    }

    Ok(effective)
}

fn validate_value(param: &ToolParameterDescriptor, value: &Value) -> Result<(), AppError> {
    match param.param_type {
        ParameterType::String => {
            let s = value
                .as_str()
                .ok_or_else(|| type_error(param, "string"))?;
            if let Some(min) = param.min_length {
                if s.len() < min {
                    return Err(bound_error(param, format!("length must be >= {min}")));
                }
            }
            if let Some(max) = param.max_length {
                if s.len() > max {
                    return Err(bound_error(param, format!("length must be <= {max}")));
                }
            }
            if let Some(pattern) = &param.pattern {
                let re = Regex::new(pattern)
                    .map_err(|e| AppError::validation(format!("invalid pattern for '{}': {e}", param.name)))?;
                if !re.is_match(s) {
                    return Err(bound_error(param, format!("does not match pattern {pattern}")));
                }
            }
        }
        ParameterType::Boolean => {
            value.as_bool().ok_or_else(|| type_error(param, "boolean"))?;
        }
        ParameterType::Integer => {
            let n = value.as_i64().ok_or_else(|| type_error(param, "integer"))?;
            check_numeric_bounds(param, n as f64)?;
        }
        ParameterType::Number | ParameterType::Float => {
            let n = value.as_f64().ok_or_else(|| type_error(param, "number"))?;
            check_numeric_bounds(param, n)?;
        }
        ParameterType::Array => {
            let arr = value.as_array().ok_or_else(|| type_error(param, "array"))?;
            let item_type = param
                .item_type
                .ok_or_else(|| AppError::validation(format!("array parameter '{}' missing itemType", param.name)))?;
            for item in arr {
                validate_array_item(param, item_type, item)?;
            }
        }
    }

    if let Some(enum_values) = &param.enum_values {
        if !enum_values.contains(value) {
            return Err(bound_error(param, "value is not a member of enum"));
        }
    }

    Ok(())
}

fn validate_array_item(
    param: &ToolParameterDescriptor,
    item_type: ParameterType,
    item: &Value,
) -> Result<(), AppError> {
    let ok = match item_type {
        ParameterType::String => item.is_string(),
        ParameterType::Boolean => item.is_boolean(),
        ParameterType::Integer | ParameterType::Number | ParameterType::Float => item.is_number(),
        ParameterType::Array => false,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "array parameter '{}' has an item that is not of type {:?}",
            param.name, item_type
        )))
    }
}

fn check_numeric_bounds(param: &ToolParameterDescriptor, n: f64) -> Result<(), AppError> {
    if let Some(min) = param.min {
        if n < min {
            return Err(bound_error(param, format!("must be >= {min}")));
        }
    }
    if let Some(max) = param.max {
        if n > max {
            return Err(bound_error(param, format!("must be <= {max}")));
        }
    }
    Ok(())
}

fn type_error(param: &ToolParameterDescriptor, expected: &str) -> AppError {
    AppError::validation(format!("parameter '{}' must be of type {expected}", param.name))
}

fn bound_error(param: &ToolParameterDescriptor, detail: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("parameter '{}' {detail}", param.name))
}

/// Format a tool name as a human-readable title, e.g. `user_by_id` -> `User By Id`.
#[must_use]
pub fn title_case(tool_name: &str) -> String {
    tool_name
        .split(|c: char| c == '_' || c == '-')
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int_param(name: &str, min: Option<f64>, max: Option<f64>, required: bool) -> ToolParameterDescriptor {
        ToolParameterDescriptor {
            name: name.into(),
            param_type: ParameterType::Integer,
            item_type: None,
            description: None,
            default: None,
            required: Some(required),
            min,
            max,
            min_length: None,
            max_length: None,
            enum_values: None,
            pattern: None,
        }
    }

    #[test]
    fn rejects_string_for_integer_parameter_strict_typing() {
        let params = vec![int_param("id", None, None, true)];
        let err = validate_input(&json!({"id": "42"}), &params).unwrap_err();
        assert!(err.message.contains("integer"));
    }

    #[test]
    fn boundary_values_are_inclusive() {
        let params = vec![int_param("age", Some(0.0), Some(120.0), true)];
        assert!(validate_input(&json!({"age": 0}), &params).is_ok());
        assert!(validate_input(&json!({"age": 120}), &params).is_ok());
        assert!(validate_input(&json!({"age": 121}), &params).is_err());
        assert!(validate_input(&json!({"age": -1}), &params).is_err());
    }

    #[test]
    fn missing_required_parameter_fails() {
        let params = vec![int_param("id", None, None, true)];
        assert!(validate_input(&json!({}), &params).is_err());
    }

    #[test]
    fn default_substituted_when_omitted() {
        let mut param = int_param("limit", None, None, false);
        param.default = Some(json!(10));
        let effective = validate_input(&json!({}), &[param]).unwrap();
        assert_eq!(effective["limit"], json!(10));
    }

    #[test]
    fn title_case_formats_snake_case_name() {
        assert_eq!(title_case("user_by_id"), "User By Id");
    }
}
