// ABOUTME: Environment-based configuration management for deployment-specific settings
// ABOUTME: Builds ServerConfig from env vars (spec §6.4), overlaid by CLI flags (spec §6.3)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, env_vars};
use crate::errors::AppResult;

use super::merge::MergeOptions;

/// Strongly typed log level configuration, mirrored in `tracing_subscriber::EnvFilter`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

/// Dispatch transport selector (spec §6.3 `--transport`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

impl Transport {
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "http" => Self::Http,
            _ => Self::Stdio,
        }
    }
}

/// Authenticated-session mode settings (spec §4.6, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    pub allow_http: bool,
    pub key_id: String,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub token_ttl_seconds: i64,
    pub max_concurrent_sessions: usize,
    pub cleanup_interval_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_http: false,
            key_id: "default".to_owned(),
            private_key_path: PathBuf::from("auth_private_key.pem"),
            public_key_path: PathBuf::from("auth_public_key.pem"),
            token_ttl_seconds: defaults::TOKEN_TTL_SECONDS,
            max_concurrent_sessions: defaults::MAX_CONCURRENT_SESSIONS,
            cleanup_interval_seconds: defaults::CLEANUP_INTERVAL_SECONDS,
        }
    }
}

/// Top-level process configuration, built from environment variables and
/// then overlaid by CLI flags in [`crate::cli::Cli::apply_overrides`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub tools_path: Option<String>,
    pub selected_toolsets: Vec<String>,
    pub transport: Transport,
    pub http_port: u16,
    pub log_level: LogLevel,
    pub merge_options: MergeOptions,
    pub auth: AuthConfig,
    pub default_db_host: Option<String>,
    pub default_db_user: Option<String>,
    pub default_db_pass: Option<String>,
    pub default_db_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tools_path: None,
            selected_toolsets: Vec::new(),
            transport: Transport::default(),
            http_port: defaults::HTTP_PORT,
            log_level: LogLevel::default(),
            merge_options: MergeOptions::default(),
            auth: AuthConfig::default(),
            default_db_host: None,
            default_db_user: None,
            default_db_pass: None,
            default_db_port: None,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from environment variables alone (spec §6.4).
    ///
    /// # Errors
    /// Never fails today but returns `AppResult` to leave room for future
    /// validation (e.g. rejecting contradictory env values) without a
    /// breaking signature change.
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        config.tools_path = std::env::var(env_vars::TOOLS_YAML_PATH).ok();
        config.default_db_host = std::env::var(env_vars::DB_HOST).ok();
        config.default_db_user = std::env::var(env_vars::DB_USER).ok();
        config.default_db_pass = std::env::var(env_vars::DB_PASS).ok();
        config.default_db_port = std::env::var(env_vars::DB_PORT).ok().and_then(|v| v.parse().ok());

        if let Ok(transport) = std::env::var(env_vars::TRANSPORT) {
            config.transport = Transport::from_str_or_default(&transport);
        }
        if let Ok(level) = std::env::var(env_vars::LOG_LEVEL) {
            config.log_level = LogLevel::from_str_or_default(&level);
        }
        if let Ok(port) = std::env::var(env_vars::HTTP_PORT) {
            if let Ok(port) = port.parse() {
                config.http_port = port;
            }
        }
        if let Ok(toolsets) = std::env::var(env_vars::SELECTED_TOOLSETS) {
            config.selected_toolsets = split_csv(&toolsets);
        }

        config.auth.enabled = env_flag(env_vars::HTTP_AUTH_ENABLED, false);
        config.auth.allow_http = env_flag(env_vars::AUTH_ALLOW_HTTP, false);
        if let Ok(key_id) = std::env::var(env_vars::AUTH_KEY_ID) {
            config.auth.key_id = key_id;
        }
        if let Ok(path) = std::env::var(env_vars::AUTH_PRIVATE_KEY_PATH) {
            config.auth.private_key_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(env_vars::AUTH_PUBLIC_KEY_PATH) {
            config.auth.public_key_path = PathBuf::from(path);
        }
        if let Ok(ttl) = std::env::var(env_vars::AUTH_TOKEN_TTL_SECONDS) {
            if let Ok(ttl) = ttl.parse() {
                config.auth.token_ttl_seconds = ttl;
            }
        }
        if let Ok(max) = std::env::var(env_vars::AUTH_MAX_CONCURRENT_SESSIONS) {
            if let Ok(max) = max.parse() {
                config.auth.max_concurrent_sessions = max;
            }
        }
        if let Ok(interval) = std::env::var(env_vars::AUTH_CLEANUP_INTERVAL_SECONDS) {
            if let Ok(interval) = interval.parse() {
                config.auth.cleanup_interval_seconds = interval;
            }
        }

        config.merge_options.merge_arrays = env_flag(env_vars::MERGE_ARRAYS, config.merge_options.merge_arrays);
        config.merge_options.allow_duplicate_tools =
            env_flag(env_vars::ALLOW_DUPLICATE_TOOLS, config.merge_options.allow_duplicate_tools);
        config.merge_options.allow_duplicate_sources = env_flag(
            env_vars::ALLOW_DUPLICATE_SOURCES,
            config.merge_options.allow_duplicate_sources,
        );

        Ok(config)
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_picks_up_transport_and_toolsets() {
        std::env::set_var(env_vars::TRANSPORT, "http");
        std::env::set_var(env_vars::SELECTED_TOOLSETS, "fast, slow");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.selected_toolsets, vec!["fast", "slow"]);
        std::env::remove_var(env_vars::TRANSPORT);
        std::env::remove_var(env_vars::SELECTED_TOOLSETS);
    }

    #[test]
    fn log_level_falls_back_to_info() {
        assert_eq!(LogLevel::from_str_or_default("nonsense"), LogLevel::Info);
    }
}
