//! npm domain module.
//!
//! Looks packages up in an npm registry and expands their dependency trees.
//!
//! ## Architecture
//!
//! - `registry.rs` - Registry documents, the `PackageRegistry` trait and the HTTP client
//! - `version.rs` - Choosing the version to analyze
//! - `tree.rs` - Recursive tree construction with cycle and depth cut-offs
//! - `summary.rs` - Unique-count and depth statistics over a built tree
//! - `metadata.rs` - Normalizers for license/repository/author/keywords
//! - `service.rs` - Report assembly used by the npm tools
//! - `error.rs` - npm-specific error types

mod error;
pub mod metadata;
pub mod registry;
mod service;
pub mod summary;
pub mod tree;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use error::NpmError;
pub use registry::{NpmRegistryClient, PackageMetadata, PackageRegistry, VersionManifest};
pub use service::{DependencyTreeReport, NpmService, PackageAnalysis};
pub use summary::{TreeSummary, summarize};
pub use tree::{DependencyNode, DependencyTree, NodeOutcome, TreeBuilder, normalize_max_depth};
