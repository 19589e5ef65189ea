// ABOUTME: MCP JSON-RPC protocol and transports (stdio line-framed, HTTP)
// ABOUTME: `protocol::dispatch` is transport-agnostic; each transport only frames/unframes (spec §6)

pub mod jsonrpc;
pub mod protocol;
pub mod schema;
pub mod transport_http;
pub mod transport_stdio;

pub use protocol::{dispatch, ServerState};
