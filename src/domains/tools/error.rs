//! Tool-specific error types.
//!
//! Package lookups that fail are not `ToolError`s: they come back as tool
//! results with `isError` set. These cover dispatch and argument problems.

use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Errors that can occur while dispatching a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Arguments did not match the tool's parameter schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The worker running the tool died before producing a result.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(_) | ToolError::InvalidArguments(_) => {
                McpError::invalid_params(err.to_string(), None)
            }
            ToolError::ExecutionFailed(_) => McpError::internal_error(err.to_string(), None),
        }
    }
}
