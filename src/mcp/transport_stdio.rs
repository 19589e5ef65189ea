// ABOUTME: Line-framed stdio transport — one JSON-RPC request/response per line (spec §6.2)
// ABOUTME: No bearer token support over stdio; every call routes through the default Source Pool Manager

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::mcp::jsonrpc::{error_codes, JsonRpcResponse};
use crate::mcp::protocol::{dispatch, ServerState};

/// Read newline-delimited JSON-RPC requests from stdin, dispatch each one,
/// and write the response as a single line of JSON to stdout. Runs until
/// stdin is closed.
///
/// # Errors
/// Returns an error if reading stdin or writing stdout fails. A malformed
/// request line is reported as a JSON-RPC parse error response, not a
/// transport failure.
pub async fn run(state: &ServerState) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    tracing::info!("stdio transport started");

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str(trimmed) {
            Ok(request) => dispatch(state, request, None).await,
            Err(e) => JsonRpcResponse::error(
                None,
                error_codes::PARSE_ERROR,
                format!("invalid JSON-RPC request: {e}"),
            ),
        };

        let serialized = serde_json::to_string(&response)
            .unwrap_or_else(|_| r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"internal error"},"id":null}"#.to_owned());
        stdout.write_all(serialized.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!("stdio transport closed");
    Ok(())
}
