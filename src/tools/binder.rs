// ABOUTME: Parameter Binder — validates supplied values and binds them into placeholder SQL
// ABOUTME: Detects named (:name) vs positional (?) mode, expands arrays, forbids mixed styles (spec §4.3)

use serde_json::Value;

use crate::config::schema::{ParameterType, ToolParameterDescriptor};
use crate::errors::AppError;

/// The placeholder style detected in a SQL template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    Named,
    Positional,
    None,
}

/// Outcome of binding a template against supplied values.
#[derive(Debug, Clone)]
pub struct BindResult {
    pub final_sql: String,
    pub binds: Vec<Value>,
    pub mode: BindMode,
    pub used_names: Vec<String>,
    pub missing_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Named,
    Positional,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
    name: Option<String>,
}

/// Scan `template`, skipping single-quoted string literals and `--`/`/*…*/`
/// comments, and return every `:name` or `?` token found outside them
/// (spec §4.3 "Quoting").
fn scan_tokens(template: &str) -> Vec<Token> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                // Single-quoted literal; '' is an escaped quote inside one.
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b':' => {
                let name_start = i + 1;
                let mut j = name_start;
                while j < bytes.len() && is_ident_byte(bytes[j], j == name_start) {
                    j += 1;
                }
                if j > name_start {
                    tokens.push(Token {
                        kind: TokenKind::Named,
                        start: i,
                        end: j,
                        name: Some(template[name_start..j].to_owned()),
                    });
                    i = j;
                } else {
                    i += 1;
                }
            }
            b'?' => {
                tokens.push(Token {
                    kind: TokenKind::Positional,
                    start: i,
                    end: i + 1,
                    name: None,
                });
                i += 1;
            }
            _ => i += 1,
        }
    }

    tokens
}

fn is_ident_byte(b: u8, is_first: bool) -> bool {
    if is_first {
        b == b'_' || b.is_ascii_alphabetic()
    } else {
        b == b'_' || b.is_ascii_alphanumeric()
    }
}

/// Detect the binding mode of `template` (spec §4.3). Mixing named and
/// positional tokens in the same template is a compile-time error.
///
/// # Errors
/// Returns [`AppError::validation`] when both styles are present.
pub fn detect_mode(template: &str) -> Result<BindMode, AppError> {
    let tokens = scan_tokens(template);
    let has_named = tokens.iter().any(|t| t.kind == TokenKind::Named);
    let has_positional = tokens.iter().any(|t| t.kind == TokenKind::Positional);

    match (has_named, has_positional) {
        (true, true) => Err(AppError::validation(
            "statement mixes :name and ? placeholders; this is not allowed",
        )),
        (true, false) => Ok(BindMode::Named),
        (false, true) => Ok(BindMode::Positional),
        (false, false) => Ok(BindMode::None),
    }
}

/// Bind `supplied` values into `template` using `descriptors`, producing
/// final SQL with positional markers and an ordered bind list.
///
/// # Errors
/// Returns [`AppError::validation`] for unknown placeholder names, missing
/// required values, positional count mismatches, or type errors within
/// array expansion.
pub fn bind(
    template: &str,
    supplied: &std::collections::HashMap<String, Value>,
    descriptors: &[ToolParameterDescriptor],
) -> Result<BindResult, AppError> {
    // Direct-substitution escape hatch (spec §4.3, §9): exactly one string
    // parameter whose name matches the entire trimmed template `:name`.
    if let Some(result) = try_direct_substitution(template, supplied, descriptors)? {
        return Ok(result);
    }

    let mode = detect_mode(template)?;
    match mode {
        BindMode::Named => bind_named(template, supplied, descriptors),
        BindMode::Positional => bind_positional(template, supplied, descriptors),
        BindMode::None => Ok(BindResult {
            final_sql: template.to_owned(),
            binds: Vec::new(),
            mode,
            used_names: Vec::new(),
            missing_names: Vec::new(),
        }),
    }
}

fn try_direct_substitution(
    template: &str,
    supplied: &std::collections::HashMap<String, Value>,
    descriptors: &[ToolParameterDescriptor],
) -> Result<Option<BindResult>, AppError> {
    let [only] = descriptors else { return Ok(None) };
    if only.param_type != ParameterType::String {
        return Ok(None);
    }
    let trimmed = template.trim();
    if trimmed != format!(":{}", only.name) {
        return Ok(None);
    }

    let value = supplied
        .get(&only.name)
        .cloned()
        .or_else(|| only.default.clone())
        .ok_or_else(|| AppError::validation(format!("missing required parameter '{}'", only.name)))?;
    let text = value
        .as_str()
        .ok_or_else(|| AppError::validation(format!("parameter '{}' must be a string", only.name)))?
        .to_owned();

    Ok(Some(BindResult {
        final_sql: text,
        binds: Vec::new(),
        mode: BindMode::Named,
        used_names: vec![only.name.clone()],
        missing_names: Vec::new(),
    }))
}

fn bind_named(
    template: &str,
    supplied: &std::collections::HashMap<String, Value>,
    descriptors: &[ToolParameterDescriptor],
) -> Result<BindResult, AppError> {
    let tokens = scan_tokens(template);
    let mut out = String::with_capacity(template.len());
    let mut binds = Vec::new();
    let mut used_names = Vec::new();
    let mut missing_names = Vec::new();
    let mut cursor = 0;

    for token in &tokens {
        let name = token.name.as_ref().expect("named token always carries a name");
        let descriptor = descriptors
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| AppError::validation(format!("placeholder ':{name}' has no matching parameter")))?;

        let value = resolve_value(descriptor, supplied, &mut missing_names)?;

        out.push_str(&template[cursor..token.start]);
        push_markers_for(descriptor, &value, &mut out, &mut binds)?;
        cursor = token.end;
        used_names.push(name.clone());
    }
    out.push_str(&template[cursor..]);

    if !missing_names.is_empty() {
        return Err(AppError::validation(format!(
            "missing required parameter(s): {}",
            missing_names.join(", ")
        )));
    }

    Ok(BindResult {
        final_sql: out,
        binds,
        mode: BindMode::Named,
        used_names,
        missing_names,
    })
}

fn bind_positional(
    template: &str,
    supplied: &std::collections::HashMap<String, Value>,
    descriptors: &[ToolParameterDescriptor],
) -> Result<BindResult, AppError> {
    let tokens = scan_tokens(template);
    let positional: Vec<&Token> = tokens.iter().filter(|t| t.kind == TokenKind::Positional).collect();

    if positional.len() != descriptors.len() {
        return Err(AppError::validation(format!(
            "statement has {} positional placeholder(s) but {} parameter(s) are declared",
            positional.len(),
            descriptors.len()
        )));
    }

    let mut out = String::with_capacity(template.len());
    let mut binds = Vec::new();
    let mut used_names = Vec::new();
    let mut missing_names = Vec::new();
    let mut cursor = 0;

    for (token, descriptor) in positional.iter().zip(descriptors.iter()) {
        let value = resolve_value(descriptor, supplied, &mut missing_names)?;
        out.push_str(&template[cursor..token.start]);
        push_markers_for(descriptor, &value, &mut out, &mut binds)?;
        cursor = token.end;
        used_names.push(descriptor.name.clone());
    }
    out.push_str(&template[cursor..]);

    if !missing_names.is_empty() {
        return Err(AppError::validation(format!(
            "missing required parameter(s): {}",
            missing_names.join(", ")
        )));
    }

    Ok(BindResult {
        final_sql: out,
        binds,
        mode: BindMode::Positional,
        used_names,
        missing_names,
    })
}

fn resolve_value(
    descriptor: &ToolParameterDescriptor,
    supplied: &std::collections::HashMap<String, Value>,
    missing_names: &mut Vec<String>,
) -> Result<Value, AppError> {
    if let Some(value) = supplied.get(&descriptor.name) {
        return Ok(value.clone());
    }
    if let Some(default) = &descriptor.default {
        return Ok(default.clone());
    }
    if descriptor.is_required() {
        missing_names.push(descriptor.name.clone());
    }
    Ok(Value::Null)
}

/// Emit one `?` marker per bound value, expanding arrays to a
/// comma-separated list of markers (spec §4.3 "Array parameters").
fn push_markers_for(
    descriptor: &ToolParameterDescriptor,
    value: &Value,
    out: &mut String,
    binds: &mut Vec<Value>,
) -> Result<(), AppError> {
    if descriptor.param_type == ParameterType::Array {
        let items = value
            .as_array()
            .ok_or_else(|| AppError::validation(format!("parameter '{}' must be an array", descriptor.name)))?;
        let markers: Vec<&str> = std::iter::repeat("?").take(items.len()).collect();
        out.push_str(&markers.join(", "));
        binds.extend(items.iter().cloned());
    } else {
        out.push('?');
        binds.push(value.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

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

    #[test]
    fn named_binding_produces_one_marker_and_one_bind() {
        let descriptors = vec![int_param("id")];
        let mut supplied = HashMap::new();
        supplied.insert("id".to_owned(), json!(42));

        let result = bind("SELECT name FROM users WHERE id = :id", &supplied, &descriptors).unwrap();
        assert_eq!(result.final_sql, "SELECT name FROM users WHERE id = ?");
        assert_eq!(result.binds, vec![json!(42)]);
        assert_eq!(result.mode, BindMode::Named);
    }

    #[test]
    fn positional_count_mismatch_fails() {
        let descriptors = vec![int_param("id")];
        let supplied = HashMap::new();
        let err = bind("SELECT * FROM t WHERE a = ? AND b = ?", &supplied, &descriptors).unwrap_err();
        assert!(err.message.contains("positional placeholder"));
    }

    #[test]
    fn mixed_styles_rejected() {
        assert!(detect_mode("SELECT * FROM t WHERE a = :a AND b = ?").is_err());
    }

    #[test]
    fn array_parameter_expands_to_markers() {
        let descriptor = ToolParameterDescriptor {
            name: "ids".into(),
            param_type: ParameterType::Array,
            item_type: Some(ParameterType::Integer),
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
        let mut supplied = HashMap::new();
        supplied.insert("ids".to_owned(), json!([1, 2, 3]));
        let result = bind("SELECT * FROM t WHERE id IN (:ids)", &supplied, &[descriptor]).unwrap();
        assert_eq!(result.final_sql, "SELECT * FROM t WHERE id IN (?, ?, ?)");
        assert_eq!(result.binds, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn quoted_literals_are_ignored_by_the_scanner() {
        let descriptors = Vec::new();
        let supplied = HashMap::new();
        let result = bind("SELECT * FROM t WHERE name = 'a:b?c'", &supplied, &descriptors).unwrap();
        assert_eq!(result.final_sql, "SELECT * FROM t WHERE name = 'a:b?c'");
        assert_eq!(result.mode, BindMode::None);
    }

    #[test]
    fn direct_substitution_tool_bypasses_binding() {
        let descriptor = ToolParameterDescriptor {
            name: "raw_sql".into(),
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
        };
        let mut supplied = HashMap::new();
        supplied.insert("raw_sql".to_owned(), json!("SELECT * FROM sysibm.sysdummy1"));
        let result = bind(":raw_sql", &supplied, &[descriptor]).unwrap();
        assert_eq!(result.final_sql, "SELECT * FROM sysibm.sysdummy1");
        assert!(result.binds.is_empty());
    }

    #[test]
    fn missing_named_descriptor_fails() {
        let descriptors: Vec<ToolParameterDescriptor> = Vec::new();
        let supplied = HashMap::new();
        let err = bind("SELECT * FROM t WHERE id = :id", &supplied, &descriptors).unwrap_err();
        assert!(err.message.contains("no matching parameter"));
    }
}
