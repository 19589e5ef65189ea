// ABOUTME: Application constants organized by domain
// ABOUTME: Defaults, env var names, and limits shared across the config, tool, and auth pipelines

//! Constants module
//!
//! Constants are grouped by domain rather than dumped into one namespace,
//! matching how sizable services in this corpus keep magic numbers and
//! environment variable names discoverable.

/// Environment variable names recognized by the server (spec §6.4).
pub mod env_vars {
    pub const DB_HOST: &str = "DB2i_HOST";
    pub const DB_USER: &str = "DB2i_USER";
    pub const DB_PASS: &str = "DB2i_PASS";
    pub const DB_PORT: &str = "DB2i_PORT";
    pub const TOOLS_YAML_PATH: &str = "TOOLS_YAML_PATH";
    pub const TRANSPORT: &str = "MCP_TRANSPORT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const HTTP_AUTH_ENABLED: &str = "IBMI_HTTP_AUTH_ENABLED";
    pub const AUTH_ALLOW_HTTP: &str = "IBMI_AUTH_ALLOW_HTTP";
    pub const AUTH_KEY_ID: &str = "IBMI_AUTH_KEY_ID";
    pub const AUTH_PRIVATE_KEY_PATH: &str = "IBMI_AUTH_PRIVATE_KEY_PATH";
    pub const AUTH_PUBLIC_KEY_PATH: &str = "IBMI_AUTH_PUBLIC_KEY_PATH";
    pub const AUTH_TOKEN_TTL_SECONDS: &str = "IBMI_AUTH_TOKEN_TTL_SECONDS";
    pub const AUTH_MAX_CONCURRENT_SESSIONS: &str = "IBMI_AUTH_MAX_CONCURRENT_SESSIONS";
    pub const AUTH_CLEANUP_INTERVAL_SECONDS: &str = "IBMI_AUTH_CLEANUP_INTERVAL_SECONDS";
    pub const MERGE_ARRAYS: &str = "IBMI_YAML_MERGE_ARRAYS";
    pub const ALLOW_DUPLICATE_TOOLS: &str = "IBMI_YAML_ALLOW_DUPLICATE_TOOLS";
    pub const ALLOW_DUPLICATE_SOURCES: &str = "IBMI_YAML_ALLOW_DUPLICATE_SOURCES";
    pub const SELECTED_TOOLSETS: &str = "IBMI_SELECTED_TOOLSETS";
    pub const HTTP_PORT: &str = "HTTP_PORT";
}

/// Defaults mirrored across the config loader, binder, and pool manager.
pub mod defaults {
    /// Default `ToolSecurityPolicy::max_query_length`.
    pub const MAX_QUERY_LENGTH: usize = 10_000;
    /// Default starting size for a lazily created source pool.
    pub const POOL_STARTING_SIZE: u32 = 2;
    /// Default max size for a lazily created source pool.
    pub const POOL_MAX_SIZE: u32 = 10;
    /// Default bearer token lifetime, seconds.
    pub const TOKEN_TTL_SECONDS: i64 = 3600;
    /// Default reaper sweep interval, seconds.
    pub const CLEANUP_INTERVAL_SECONDS: u64 = 60;
    /// Default concurrency cap on active authenticated sessions.
    pub const MAX_CONCURRENT_SESSIONS: usize = 100;
    /// Default HTTP bind port.
    pub const HTTP_PORT: u16 = 8080;
    /// Rows included in the markdown-formatted response surfaced through the adapter.
    pub const MAX_FORMATTED_ROWS: usize = 500;
}

/// Bounds enforced on auth session request bodies (spec §4.6 step 5).
pub mod auth_limits {
    pub const MAX_DURATION_SECONDS: i64 = 86_400;
    pub const MIN_POOL_START: u32 = 1;
    pub const MAX_POOL_START: u32 = 50;
    pub const MIN_POOL_MAX: u32 = 1;
    pub const MAX_POOL_MAX: u32 = 100;
    /// `sessionKey` length required after RSA-OAEP unwrap.
    pub const SESSION_KEY_LEN: usize = 32;
    /// Bearer token entropy, bytes, before base64url encoding.
    pub const TOKEN_BYTES: usize = 256;
    pub const GCM_IV_LEN: usize = 12;
    pub const GCM_TAG_LEN: usize = 16;
}

/// HTTP status codes used by `errors::ErrorCode::http_status`.
pub mod http_status {
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}
