//! npm package analysis tool.
//!
//! Looks up a single package version and reports its metadata together with
//! its production, development and peer dependency declarations.

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

/// Parameters for the npm analysis tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NpmAnalyzeParams {
    /// The npm package name to analyze.
    #[schemars(description = "The npm package name to analyze (e.g., 'express', 'react', '@types/node')")]
    pub package_name: String,

    /// Specific version to analyze.
    #[serde(default)]
    #[schemars(
        description = "Optional: specific version to analyze (e.g., '4.18.0'). If not provided, analyzes the latest version."
    )]
    pub version: Option<String>,
}

// ============================================================================
// Tool Implementation
// ============================================================================

/// npm package analysis tool.
#[derive(Debug, Clone)]
pub struct NpmAnalyzeTool;

impl NpmAnalyzeTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "npm_dependencies_analyze";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Fetch and analyze an npm package from the registry. \
         Returns the analyzed version, latest version, description, license, homepage, repository, \
         author, keywords, publish time, and its dependencies, devDependencies and peerDependencies \
         with their declared version ranges.";

    /// Execute the tool logic. Blocks on the registry; run off the async runtime.
    #[instrument(skip_all, fields(package = %params.package_name))]
    pub fn execute(params: &NpmAnalyzeParams, config: &Config) -> CallToolResult {
        info!(
            "npm analyze tool called for {} (version: {:?})",
            params.package_name, params.version
        );

        let service = match npm_service(config) {
            Ok(service) => service,
            Err(e) => return error_result(&format!("Failed to create registry client: {}", e)),
        };

        match service.analyze(&params.package_name, params.version.as_deref()) {
            Ok(analysis) => {
                let summary = format!(
                    "{}@{} (latest {}): {} dependencies, {} devDependencies, {} peerDependencies",
                    analysis.name,
                    analysis.version,
                    analysis.latest_version,
                    analysis.dependency_count,
                    analysis.dev_dependencies.len(),
                    analysis.peer_dependencies.len()
                );
                structured_result(summary, analysis)
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
        let params: NpmAnalyzeParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let result = run_blocking(move || Self::execute(&params, &config))?;

        Ok(super::common::to_http_response(result))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<NpmAnalyzeParams>(),
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
                let params: NpmAnalyzeParams =
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
