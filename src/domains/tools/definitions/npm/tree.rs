//! npm dependency tree tool.
//!
//! Recursively expands the production dependencies of a package, marking
//! circular references, depth cut-offs and per-dependency lookup failures
//! instead of aborting.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::config::Config;
use crate::domains::tools::ToolError;

#[cfg(any(feature = "http", test))]
use super::common::run_blocking;
use super::common::{error_result, npm_service, spawn_tool, structured_result};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the dependency tree tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NpmTreeParams {
    /// The npm package name to analyze.
    #[schemars(description = "The npm package name to analyze (e.g., 'express', 'react', '@types/node')")]
    pub package_name: String,

    /// Specific version of the root package.
    #[serde(default)]
    #[schemars(
        description = "Optional: specific version of the root package (e.g., '4.18.0'). Dependencies always resolve to their latest version."
    )]
    pub version: Option<String>,

    /// Maximum tree depth.
    #[serde(default)]
    #[schemars(description = "Optional: maximum dependency depth (default: 5, max: 10)")]
    pub max_depth: Option<i64>,
}

// ============================================================================
// Tool Implementation
// ============================================================================

/// npm dependency tree tool.
#[derive(Debug, Clone)]
pub struct NpmTreeTool;

impl NpmTreeTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_npm_dependencies_tree";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Build the full dependency tree of an npm package. \
         Each dependency is resolved to its latest version and expanded recursively up to max_depth \
         (default 5, max 10). Circular references, depth cut-offs and lookup failures are marked on \
         the affected nodes. Returns package metadata, the nested tree, the number of unique \
         dependencies and the tree depth.";

    /// Execute the tool logic. Blocks on the registry; run off the async runtime.
    #[instrument(skip_all, fields(package = %params.package_name))]
    pub fn execute(params: &NpmTreeParams, config: &Config) -> CallToolResult {
        info!(
            "npm tree tool called for {} (version: {:?}, max_depth: {:?})",
            params.package_name, params.version, params.max_depth
        );

        let service = match npm_service(config) {
            Ok(service) => service,
            Err(e) => return error_result(&format!("Failed to create registry client: {}", e)),
        };

        match service.dependency_tree(
            &params.package_name,
            params.version.as_deref(),
            params.max_depth,
        ) {
            Ok(report) => {
                let summary = format!(
                    "{}@{}: {} unique dependencies, tree depth {} (max depth {})",
                    report.name,
                    report.version,
                    report.total_dependencies,
                    report.tree_depth,
                    report.max_depth
                );
                structured_result(summary, report)
            }
            Err(e) => error_result(&e.to_string()),
        }
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        config: Arc<Config>,
    ) -> Result<serde_json::Value, ToolError> {
        let params: NpmTreeParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let result = run_blocking(move || Self::execute(&params, &config))?;

        Ok(super::common::to_http_response(result))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<NpmTreeParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>(config: Arc<Config>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let config = config.clone();
            async move {
                let params: NpmTreeParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

                spawn_tool(move || Self::execute(&params, &config))
                    .await
                    .map_err(McpError::from)
            }
            .boxed()
        })
    }
}
