//! MCP developer tools server.
//!
//! A Model Context Protocol (MCP) server exposing npm package analysis:
//! metadata lookup for a single package version and recursive dependency
//! tree construction with circular-reference and depth-limit detection.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the MCP server handler and transports
//! - **domains**: business logic organized by bounded contexts
//!   - **npm**: registry client, version selection, tree builder and summaries
//!   - **tools**: MCP tool definitions wrapping the npm domain
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_devtools::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     config.validate()?;
//!     let server = McpServer::new(config.clone());
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
pub use domains::npm::{NpmRegistryClient, NpmService};
