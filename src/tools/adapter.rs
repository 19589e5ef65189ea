// ABOUTME: Tool Runtime Adapter — turns a ToolInvocationResult into an MCP ToolCallResponse
// ABOUTME: Formats at most MAX_FORMATTED_ROWS rows as a markdown table; structuredContent keeps all rows

use serde_json::{json, Value};

use crate::constants::defaults::MAX_FORMATTED_ROWS;
use crate::mcp::schema::{ContentBlock, ToolCallResponse};
use crate::tools::result::ToolInvocationResult;

/// Render `result` as the MCP response shape: a human-readable markdown
/// table (truncated to [`MAX_FORMATTED_ROWS`] rows) in `content`, and the
/// full, untruncated result in `structuredContent` (spec §4.9).
#[must_use]
pub fn to_tool_call_response(result: &ToolInvocationResult) -> ToolCallResponse {
    let structured_content = serde_json::to_value(result).unwrap_or_else(|_| json!({ "success": result.success }));

    if !result.success {
        let message = result.error.clone().unwrap_or_else(|| "tool invocation failed".to_owned());
        return ToolCallResponse {
            content: vec![ContentBlock::text(format!("Error: {message}"))],
            structured_content,
            is_error: true,
        };
    }

    let data = result.data.as_deref().unwrap_or(&[]);
    let columns = result.columns.clone().unwrap_or_default();
    let text = render_markdown_table(&columns, data);

    ToolCallResponse {
        content: vec![ContentBlock::text(text)],
        structured_content,
        is_error: false,
    }
}

fn render_markdown_table(columns: &[String], rows: &[Value]) -> String {
    if columns.is_empty() {
        return "(no rows returned)".to_owned();
    }

    let mut out = String::new();
    out.push('|');
    for col in columns {
        out.push_str(col);
        out.push('|');
    }
    out.push('\n');
    out.push('|');
    for _ in columns {
        out.push_str("---|");
    }
    out.push('\n');

    let shown = rows.iter().take(MAX_FORMATTED_ROWS);
    let mut shown_count = 0;
    for row in shown {
        out.push('|');
        for col in columns {
            let cell = row.get(col).map_or_else(String::new, cell_text);
            out.push_str(&cell);
            out.push('|');
        }
        out.push('\n');
        shown_count += 1;
    }

    if rows.len() > shown_count {
        out.push_str(&format!(
            "\n_{} of {} rows shown; see structuredContent for the complete result._\n",
            shown_count,
            rows.len()
        ));
    }

    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.replace('|', "\\|"),
        other => other.to_string(),
    }
}
