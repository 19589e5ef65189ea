// ABOUTME: Centralized error handling for the config, tool, db, and auth pipelines
// ABOUTME: Defines the error kinds from spec §7 and their HTTP/response mapping
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Unified error handling
//!
//! A single [`AppError`] enum covers every failure mode named in the
//! design: config loading, tool input/SQL validation, authentication,
//! uninitialized pools, database drivers, and a catch-all internal kind.
//! Each variant carries enough structure to report multiple diagnostics at
//! once (the Config Loader and SQL Security Validator both collect all
//! violations rather than stopping at the first).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::http_status;

/// Error kinds named in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Config read/parse/validate/reference failure.
    ConfigError,
    /// Invalid tool input, bad SQL under policy, malformed envelope/body.
    ValidationError,
    /// Missing, unknown, or expired bearer token, or bad basic credentials.
    Unauthorized,
    /// Invocation against a pool that is not (yet) usable.
    ServiceNotInitialized,
    /// Driver-raised failure during connect/execute/fetch.
    DatabaseError,
    /// All other failures; surfaces as a generic failure with a trace id.
    InternalError,
}

impl ErrorCode {
    /// HTTP status code this error kind maps to.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationError => http_status::BAD_REQUEST,
            Self::Unauthorized => http_status::UNAUTHORIZED,
            Self::ServiceNotInitialized => http_status::NOT_FOUND,
            Self::ConfigError | Self::DatabaseError | Self::InternalError => {
                http_status::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// The application-wide error type.
///
/// `details` carries structured, client-safe diagnostics — e.g. the list
/// of SQL security violations, or the set of config files that failed
/// schema validation — separate from `message`, which is a single
/// human-readable summary.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    #[must_use]
    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceNotInitialized, message)
    }

    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

/// Result alias used throughout the crate.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(code = ?self.code, message = %self.message, "request failed");
        let status =
            StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::config(format!("YAML parse error: {e}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::config(format!("I/O error: {e}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::database(e.to_string())
    }
}
