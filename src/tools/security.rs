// ABOUTME: SQL Security Validator — length cap, forbidden keywords, read-only enforcement
// ABOUTME: Prefers AST-based detection via sqlparser, falls back to regex when parsing fails (spec §4.4)

use once_cell_lite::OnceLazy;
use regex::Regex;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::config::schema::ToolSecurityPolicy;
use crate::errors::AppError;

/// Statement-type keywords considered mutating/dangerous under `read_only`
/// (spec §4.4 step 3).
const DANGEROUS_STATEMENT_KEYWORDS: &[&str] = &[
    // data mutation
    "INSERT", "UPDATE", "DELETE", "REPLACE", "MERGE", "TRUNCATE",
    // schema
    "DROP", "CREATE", "ALTER", "RENAME",
    // system/exec
    "CALL", "EXEC", "EXECUTE", "SET", "DECLARE",
    // privilege
    "GRANT", "REVOKE", "DENY",
    // bulk
    "LOAD", "IMPORT", "EXPORT", "BULK",
    // control
    "SHUTDOWN", "RESTART", "KILL", "STOP", "START",
    // backup
    "BACKUP", "RESTORE", "DUMP",
    // lock
    "LOCK", "UNLOCK",
    // tx
    "COMMIT", "ROLLBACK", "SAVEPOINT",
];

/// Function identifiers that can execute host commands or reach outside the
/// declared statement (spec §4.4 step 3 bullet 2).
const DANGEROUS_FUNCTIONS: &[&str] = &[
    "SYSTEM",
    "EXEC",
    "EVAL",
    "LOAD_EXTENSION",
    "EXECUTE_IMMEDIATE",
    "XP_CMDSHELL",
    "QCMDEXC",
];

/// One violation found while validating a statement against policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
}

/// Validate `sql` against `policy`, returning every violation found rather
/// than stopping at the first (so callers can report a complete list, as
/// testable-property scenarios in spec §8 expect).
///
/// # Errors
/// Returns [`AppError::validation`] with `details.violations` populated
/// when any check fails.
pub fn validate(sql: &str, policy: &ToolSecurityPolicy) -> Result<(), AppError> {
    let mut violations = Vec::new();

    if sql.len() > policy.max_query_length {
        violations.push(Violation {
            message: format!(
                "statement length {} exceeds max_query_length {}",
                sql.len(),
                policy.max_query_length
            ),
        });
    }

    let tokens = ast_tokens(sql);

    for keyword in &policy.forbidden_keywords {
        if contains_word(&tokens, sql, keyword) {
            violations.push(Violation {
                message: format!("Forbidden keyword: {keyword}"),
            });
        }
    }

    if policy.read_only {
        violations.extend(read_only_violations(sql, &tokens));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = violations.iter().map(|v| v.message.clone()).collect();
        Err(AppError::validation(format!("{} SQL security violation(s)", messages.len()))
            .with_details(serde_json::json!({ "violations": messages })))
    }
}

/// Tokens recovered from the SQL, either by rendering the parsed AST back
/// to canonical text (preferred) or, when parsing fails, from the raw
/// text directly (spec §4.4 step 4).
struct AstTokens {
    /// Whitespace-delimited uppercased words, used for whole-word keyword
    /// and function-name matching.
    words: Vec<String>,
    /// The text the words were derived from (AST-rendered or raw).
    rendered: String,
    from_ast: bool,
}

fn ast_tokens(sql: &str) -> AstTokens {
    let dialect = GenericDialect {};
    match Parser::parse_sql(&dialect, sql) {
        Ok(statements) if !statements.is_empty() => {
            let rendered = statements
                .iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            AstTokens {
                words: tokenize_words(&rendered),
                rendered,
                from_ast: true,
            }
        }
        _ => {
            tracing::warn!("SQL security validator: AST parse failed, falling back to regex scan");
            AstTokens {
                words: tokenize_words(sql),
                rendered: sql.to_owned(),
                from_ast: false,
            }
        }
    }
}

fn tokenize_words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

fn contains_word(tokens: &AstTokens, _raw: &str, word: &str) -> bool {
    tokens.words.iter().any(|w| w.eq_ignore_ascii_case(word))
}

fn read_only_violations(sql: &str, tokens: &AstTokens) -> Vec<Violation> {
    let mut out = Vec::new();

    if let Some(top) = top_level_keyword(sql) {
        if top != "SELECT" && top != "WITH" && DANGEROUS_STATEMENT_KEYWORDS.contains(&top.as_str()) {
            out.push(Violation {
                message: format!("Write operation '{top}' detected"),
            });
        } else if top != "SELECT" && top != "WITH" {
            out.push(Violation {
                message: format!("Statement type '{top}' is not permitted under read-only policy"),
            });
        }
    }

    for func in DANGEROUS_FUNCTIONS {
        if function_call_present(&tokens.rendered, func) {
            out.push(Violation {
                message: format!("Dangerous function call: {func}"),
            });
        }
    }

    if let Some(violation) = union_violation(&tokens.rendered) {
        out.push(violation);
    }

    // Fallback regex patterns (spec §4.4 step 3): `;` followed by a
    // dangerous keyword, and `EXEC(`/`CALL`/`EXECUTE` prefixes. These run
    // regardless of AST success since they guard against statement
    // batching the parser may have collapsed into one node.
    if semicolon_then_dangerous(sql) {
        out.push(Violation {
            message: "statement batching (';' followed by a dangerous keyword) is not permitted".to_owned(),
        });
    }

    out
}

fn top_level_keyword(sql: &str) -> Option<String> {
    let stripped = strip_leading_comments_and_whitespace(sql);
    let word: String = stripped
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if word.is_empty() {
        None
    } else {
        Some(word.to_uppercase())
    }
}

fn strip_leading_comments_and_whitespace(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let trimmed = s.trim_start();
        if let Some(rest) = trimmed.strip_prefix("--") {
            s = rest.splitn(2, '\n').nth(1).unwrap_or("");
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            s = rest.splitn(2, "*/").nth(1).unwrap_or("");
        } else {
            return trimmed;
        }
    }
}

fn function_call_regex(name: &str) -> Regex {
    OnceLazy::get_or_init(name, || {
        Regex::new(&format!(r"(?i)\b{}\s*\(", regex::escape(name)))
            .unwrap_or_else(|_| Regex::new("$^").expect("empty-match fallback regex is always valid"))
    })
}

fn function_call_present(text: &str, name: &str) -> bool {
    function_call_regex(name).is_match(text)
}

fn union_violation(text: &str) -> Option<Violation> {
    let union_re = function_call_regex_static(r"(?i)\bUNION\b(\s+ALL\b)?");
    let mut last_end = 0;
    let mut parts = Vec::new();
    for m in union_re.find_iter(text) {
        parts.push(&text[last_end..m.start()]);
        last_end = m.end();
    }
    if parts.is_empty() {
        return None;
    }
    parts.push(&text[last_end..]);

    // Every segment after the first UNION must itself be a pure SELECT and
    // must not smuggle data out via SELECT ... INTO.
    for segment in parts.iter().skip(1) {
        let trimmed = segment.trim_start();
        let starts_with_select = trimmed.to_uppercase().starts_with("SELECT");
        let has_into = Regex::new(r"(?i)\bSELECT\b[\s\S]*?\bINTO\b")
            .map(|re| re.is_match(segment))
            .unwrap_or(false);
        if !starts_with_select || has_into {
            return Some(Violation {
                message: "UNION right-hand side is not a pure SELECT".to_owned(),
            });
        }
    }
    None
}

fn function_call_regex_static(pattern: &'static str) -> Regex {
    OnceLazy::get_or_init(pattern, || {
        Regex::new(pattern).unwrap_or_else(|_| Regex::new("$^").expect("empty-match fallback regex is always valid"))
    })
}

fn semicolon_then_dangerous(sql: &str) -> bool {
    let Ok(re) = Regex::new(r"(?i);\s*(insert|update|delete|drop|create|alter|exec|execute|call|grant|revoke|truncate)\b")
    else {
        return false;
    };
    re.is_match(sql)
}

/// A minimal process-lifetime memoization helper so repeatedly-compiled
/// regexes (one per dangerous function / the UNION pattern) aren't
/// rebuilt on every invocation. Grounded in the same "compile once, reuse"
/// shape as `lazy_static`/`once_cell` usage elsewhere in this corpus, kept
/// local since only this module needs it.
mod once_cell_lite {
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock};

    use regex::Regex;

    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();

    pub struct OnceLazy;

    impl OnceLazy {
        pub fn get_or_init(key: &str, build: impl FnOnce() -> Regex) -> Regex {
            let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
            let mut guard = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.entry(key.to_owned()).or_insert_with(build).clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(read_only: bool, max_len: usize, forbidden: &[&str]) -> ToolSecurityPolicy {
        ToolSecurityPolicy {
            read_only,
            max_query_length: max_len,
            forbidden_keywords: forbidden.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn select_passes_read_only() {
        assert!(validate("SELECT name FROM users WHERE id = ?", &policy(true, 10_000, &[])).is_ok());
    }

    #[test]
    fn with_prefixed_select_passes_read_only() {
        assert!(validate(
            "WITH recent AS (SELECT 1) SELECT * FROM recent",
            &policy(true, 10_000, &[])
        )
        .is_ok());
    }

    #[test]
    fn delete_rejected_under_read_only() {
        let err = validate("DELETE FROM users", &policy(true, 10_000, &[])).unwrap_err();
        let details = err.details.unwrap();
        let violations = details["violations"].as_array().unwrap();
        assert!(violations.iter().any(|v| v.as_str().unwrap().contains("Write operation 'DELETE' detected")));
    }

    #[test]
    fn forbidden_keyword_detected() {
        let err = validate(
            "SELECT QCMDEXC('x') FROM t",
            &policy(true, 10_000, &["QCMDEXC"]),
        )
        .unwrap_err();
        let violations = err.details.unwrap()["violations"].clone();
        assert!(violations.to_string().contains("Forbidden keyword: QCMDEXC"));
    }

    #[test]
    fn length_boundary_n_accepted_n_plus_1_rejected() {
        let sql_n = "SELECT 1".to_owned();
        assert!(validate(&sql_n, &policy(true, sql_n.len(), &[])).is_ok());
        assert!(validate(&sql_n, &policy(true, sql_n.len() - 1, &[])).is_err());
    }

    #[test]
    fn union_with_non_select_rhs_rejected() {
        let err = validate(
            "SELECT 1 UNION SELECT * FROM t INTO OUTFILE '/tmp/x'",
            &policy(true, 10_000, &[]),
        );
        assert!(err.is_err());
    }

    #[test]
    fn dangerous_function_call_rejected() {
        let err = validate("SELECT SYSTEM('ls') FROM sysibm.sysdummy1", &policy(true, 10_000, &[]));
        assert!(err.is_err());
    }

    #[test]
    fn statement_batching_rejected() {
        let err = validate("SELECT 1; DROP TABLE users", &policy(true, 10_000, &[]));
        assert!(err.is_err());
    }
}
