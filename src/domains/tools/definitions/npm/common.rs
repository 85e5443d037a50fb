//! Common utilities shared across the npm tools.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use tracing::{error, warn};

use crate::core::config::Config;
use crate::domains::npm::{NpmError, NpmRegistryClient, NpmService};
use crate::domains::tools::ToolError;

/// Create an error result with a formatted message.
pub fn error_result(message: &str) -> CallToolResult {
    warn!("{}", message);
    CallToolResult::error(vec![Content::text(message.to_string())])
}

/// Create a success result carrying a text summary and structured JSON.
pub fn structured_result<T: Serialize>(summary: String, data: T) -> CallToolResult {
    match serde_json::to_value(&data) {
        Ok(value) => {
            let mut result = CallToolResult::success(vec![Content::text(summary)]);
            result.structured_content = Some(value);
            result
        }
        Err(e) => {
            error!("Failed to serialize tool output: {}", e);
            error_result(&format!("Failed to serialize tool output: {}", e))
        }
    }
}

/// Build an npm service wired to the configured registry.
///
/// Must run off the async runtime: the blocking HTTP client owns its own.
pub fn npm_service(config: &Config) -> Result<NpmService, NpmError> {
    let client = NpmRegistryClient::from_config(&config.npm)?;
    Ok(NpmService::new(Arc::new(client)).with_tree_timeout(config.npm.tree_timeout()))
}

/// Run blocking tool work on a dedicated thread (HTTP dispatch).
///
/// reqwest's blocking client panics when used or dropped inside a tokio runtime.
#[cfg(any(feature = "http", test))]
pub fn run_blocking<F>(work: F) -> Result<CallToolResult, ToolError>
where
    F: FnOnce() -> CallToolResult + Send + 'static,
{
    std::thread::spawn(work)
        .join()
        .map_err(|_| ToolError::execution_failed("Thread panicked during npm lookup"))
}

/// Run blocking tool work on tokio's blocking pool from an async route.
///
/// The runtime worker stays free for other sessions while the lookup runs.
pub async fn spawn_tool<F>(work: F) -> Result<CallToolResult, ToolError>
where
    F: FnOnce() -> CallToolResult + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ToolError::execution_failed(format!("Tool task failed: {}", e)))
}

/// Convert a tool result to the JSON shape used by the HTTP transport.
#[cfg(feature = "http")]
pub fn to_http_response(result: CallToolResult) -> serde_json::Value {
    let mut response = serde_json::json!({
        "content": result.content,
        "isError": result.is_error.unwrap_or(false)
    });

    if let (Some(structured), Some(object)) = (result.structured_content, response.as_object_mut())
    {
        object.insert("structuredContent".to_string(), structured);
    }

    response
}
