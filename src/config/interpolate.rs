// ABOUTME: Environment-variable interpolation for raw YAML source text
// ABOUTME: Replaces literal ${NAME} tokens, leaving unresolved ones intact for later validation

//! `${NAME}` interpolation (spec §4.1 step 2).
//!
//! A missing environment variable is never a hard failure here — configs
//! may legitimately carry unresolved placeholders that schema or
//! cross-reference validation later rejects with a precise location.

use std::env;

/// Replace every `${NAME}` occurrence in `text` with the value of the
/// environment variable `NAME`. Unset variables are left as the literal
/// token and logged at debug level.
pub fn interpolate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = text[i + 2..].find('}') {
                let name = &text[i + 2..i + 2 + end];
                if is_valid_name(name) {
                    match env::var(name) {
                        Ok(value) => {
                            out.push_str(&value);
                        }
                        Err(_) => {
                            tracing::debug!(var = name, "env var referenced in config is unset");
                            out.push_str(&text[i..i + 2 + end + 1]);
                        }
                    }
                    i += 2 + end + 1;
                    continue;
                }
            }
        }
        // Push one UTF-8 scalar at a time to stay char-boundary safe.
        let ch_len = text[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&text[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn replaces_set_variable() {
        std::env::set_var("IBMI_TEST_VAR_A", "secretpass");
        assert_eq!(interpolate("password: ${IBMI_TEST_VAR_A}"), "password: secretpass");
        std::env::remove_var("IBMI_TEST_VAR_A");
    }

    #[test]
    #[serial]
    fn preserves_unset_variable() {
        std::env::remove_var("IBMI_TEST_VAR_UNSET");
        assert_eq!(
            interpolate("host: ${IBMI_TEST_VAR_UNSET}"),
            "host: ${IBMI_TEST_VAR_UNSET}"
        );
    }

    #[test]
    fn leaves_malformed_tokens_untouched() {
        assert_eq!(interpolate("${not closed"), "${not closed");
        assert_eq!(interpolate("${}"), "${}");
    }

    #[test]
    #[serial]
    fn multiple_tokens_in_one_line() {
        std::env::set_var("IBMI_TEST_HOST", "db.example.com");
        std::env::set_var("IBMI_TEST_USER", "svc");
        assert_eq!(
            interpolate("host: ${IBMI_TEST_HOST}, user: ${IBMI_TEST_USER}"),
            "host: db.example.com, user: svc"
        );
        std::env::remove_var("IBMI_TEST_HOST");
        std::env::remove_var("IBMI_TEST_USER");
    }
}
