//! npm tools module.
//!
//! - `analyze`: metadata and declared dependencies of one package version
//! - `tree`: recursive dependency tree with unique-count and depth statistics
//!
//! Each tool has handlers for both HTTP and STDIO/TCP transports.

pub mod analyze;
pub mod common;
pub mod tree;

pub use analyze::{NpmAnalyzeParams, NpmAnalyzeTool};
pub use tree::{NpmTreeParams, NpmTreeTool};
