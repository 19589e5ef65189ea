// ABOUTME: Main library entry point for the Db2-for-i MCP tool server
// ABOUTME: Wires the config pipeline, tool compiler, source pools, and auth session manager
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # ibmi-mcp-server
//!
//! A Model Context Protocol (MCP) server that exposes a collection of
//! database-backed tools — parameterized SQL statements described in YAML
//! configuration — to model-driven clients over a line-framed stdio
//! transport or HTTP.
//!
//! ## Architecture
//!
//! - [`config`] — loads, interpolates, validates, and merges YAML tool
//!   configuration into a [`config::schema::MergedConfig`].
//! - [`tools`] — compiles each tool descriptor into a callable
//!   [`tools::compiler::CompiledTool`], binds parameters into SQL, and
//!   enforces security policy before dispatch.
//! - [`db`] — owns named connection pools to upstream Db2-for-i sources.
//! - [`auth`] — issues and validates bearer tokens for the optional
//!   authenticated-session mode, backed by a hybrid RSA/AES-GCM envelope.
//! - [`mcp`] — the tool-dispatch runtime adapter (JSON-RPC framing over
//!   stdio or HTTP).
//! - [`http`] — the HTTP surface for auth issuance and the MCP transport.

/// Application constants shared across modules.
pub mod constants;

/// Centralized error handling.
pub mod errors;

/// Configuration pipeline: loading, interpolation, validation, merging, watching.
pub mod config;

/// Tool compilation, parameter binding, SQL security, registration.
pub mod tools;

/// Named upstream database connection pools.
pub mod db;

/// Authenticated-session bearer token issuance and per-token pools.
pub mod auth;

/// MCP JSON-RPC protocol and transports.
pub mod mcp;

/// HTTP routes (auth issuance, health, MCP-over-HTTP transport).
pub mod http;

/// CLI argument parsing.
pub mod cli;

pub use errors::{AppError, AppResult};
