// ABOUTME: Per-invocation context threaded through the binder, validator, and pool manager
// ABOUTME: Carries the request id used for log correlation and echoed back in result metadata

/// State specific to one `tools/call` invocation.
#[derive(Debug, Clone)]
pub struct ToolExecutionContext {
    pub request_id: String,
    pub tool_name: String,
    pub parent_request_id: Option<String>,
    pub bearer_token: Option<String>,
}

impl ToolExecutionContext {
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            parent_request_id: None,
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_parent_request_id(mut self, parent: impl Into<String>) -> Self {
        self.parent_request_id = Some(parent.into());
        self
    }
}
