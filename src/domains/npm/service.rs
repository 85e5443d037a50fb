//! npm analysis service.
//!
//! Assembles the reports returned by the npm tools: root lookup (failures are
//! fatal), optional tree expansion (failures stay in the tree), and the
//! normalized package fields.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::Serialize;
use tracing::{info, instrument};

use super::error::NpmError;
use super::metadata;
use super::registry::{FetchedPackage, PackageRegistry, VersionManifest};
use super::summary::summarize;
use super::tree::{DependencyNode, TreeBuilder, normalize_max_depth};
use super::version::manifest_for;

/// Flat analysis of one package version.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PackageAnalysis {
    pub name: String,
    pub version: String,
    pub description: String,
    pub license: String,
    pub homepage: String,
    pub repository: String,
    pub author: String,
    pub keywords: Vec<String>,
    pub latest_version: String,
    pub publish_time: String,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
    /// Number of production dependencies.
    pub dependency_count: usize,
}

/// Package fields plus its expanded dependency tree.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyTreeReport {
    pub name: String,
    pub version: String,
    pub description: String,
    pub license: String,
    pub homepage: String,
    pub repository: String,
    pub author: String,
    pub keywords: Vec<String>,
    pub latest_version: String,
    pub publish_time: String,
    pub max_depth: usize,
    pub dependency_tree: BTreeMap<String, DependencyNode>,
    pub total_dependencies: usize,
    pub tree_depth: usize,
}

/// Root package fields shared by both reports.
struct RootPackage {
    name: String,
    version: String,
    description: String,
    license: String,
    homepage: String,
    repository: String,
    author: String,
    keywords: Vec<String>,
    latest_version: String,
    publish_time: String,
    manifest: VersionManifest,
}

/// Service answering npm package questions against a registry.
#[derive(Clone)]
pub struct NpmService {
    registry: Arc<dyn PackageRegistry>,
    tree_timeout: Option<Duration>,
}

impl NpmService {
    /// Create a new service backed by `registry`.
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self {
            registry,
            tree_timeout: None,
        }
    }

    /// Bound the whole tree expansion by `timeout`.
    pub fn with_tree_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tree_timeout = timeout;
        self
    }

    /// Analyze a single version of a package without expanding its tree.
    #[instrument(skip(self))]
    pub fn analyze(
        &self,
        package_name: &str,
        version: Option<&str>,
    ) -> Result<PackageAnalysis, NpmError> {
        let root = self.fetch_root(package_name, version)?;
        let VersionManifest {
            dependencies,
            dev_dependencies,
            peer_dependencies,
            ..
        } = root.manifest;
        let dependencies = dependencies.unwrap_or_default();

        info!(
            "Analyzed {}@{} ({} dependencies)",
            root.name,
            root.version,
            dependencies.len()
        );

        Ok(PackageAnalysis {
            name: root.name,
            version: root.version,
            description: root.description,
            license: root.license,
            homepage: root.homepage,
            repository: root.repository,
            author: root.author,
            keywords: root.keywords,
            latest_version: root.latest_version,
            publish_time: root.publish_time,
            dependency_count: dependencies.len(),
            dependencies,
            dev_dependencies: dev_dependencies.unwrap_or_default(),
            peer_dependencies: peer_dependencies.unwrap_or_default(),
        })
    }

    /// Analyze a package and recursively expand its production dependencies.
    #[instrument(skip(self))]
    pub fn dependency_tree(
        &self,
        package_name: &str,
        version: Option<&str>,
        max_depth: Option<i64>,
    ) -> Result<DependencyTreeReport, NpmError> {
        let started = Instant::now();
        let max_depth = normalize_max_depth(max_depth);
        let root = self.fetch_root(package_name, version)?;

        let mut builder = TreeBuilder::new(self.registry.as_ref(), max_depth);
        if let Some(timeout) = self.tree_timeout {
            builder = builder.with_deadline(started + timeout);
        }
        let declared = root.manifest.dependencies.unwrap_or_default();
        let tree = builder.build(&root.name, &declared);
        let summary = summarize(&tree);

        info!(
            "Built tree for {}@{}: {} unique dependencies, depth {} in {:?}",
            root.name,
            root.version,
            summary.total_dependencies,
            summary.tree_depth,
            started.elapsed()
        );

        Ok(DependencyTreeReport {
            name: root.name,
            version: root.version,
            description: root.description,
            license: root.license,
            homepage: root.homepage,
            repository: root.repository,
            author: root.author,
            keywords: root.keywords,
            latest_version: root.latest_version,
            publish_time: root.publish_time,
            max_depth,
            dependency_tree: tree.dependencies,
            total_dependencies: summary.total_dependencies,
            tree_depth: summary.tree_depth,
        })
    }

    fn fetch_root(&self, package_name: &str, version: Option<&str>) -> Result<RootPackage, NpmError> {
        let package_name = package_name.trim();
        if package_name.is_empty() {
            return Err(NpmError::invalid_input("package_name is required"));
        }

        let FetchedPackage { metadata, version } = self.registry.fetch(package_name, version)?;
        let manifest = manifest_for(&metadata, package_name, &version)?.clone();

        let name = if metadata.name.is_empty() {
            package_name.to_string()
        } else {
            metadata.name.clone()
        };
        let description = manifest
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| metadata.description.clone())
            .unwrap_or_default();

        Ok(RootPackage {
            name,
            description,
            license: metadata::license(&metadata.license),
            homepage: metadata.homepage.clone().unwrap_or_default(),
            repository: metadata::repository(&metadata.repository),
            author: metadata::author(&metadata.author),
            keywords: metadata::keywords(&metadata.keywords),
            latest_version: metadata.latest_version().unwrap_or_default().to_string(),
            publish_time: metadata.publish_time(&version).unwrap_or_default().to_string(),
            version,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::npm::registry::{NpmRegistryClient, PackageMetadata};
    use crate::domains::npm::testing::MockRegistry;

    fn express_document() -> PackageMetadata {
        serde_json::from_value(serde_json::json!({
            "name": "express",
            "description": "Fast, unopinionated, minimalist web framework",
            "dist-tags": {"latest": "4.18.2"},
            "license": "MIT",
            "homepage": "http://expressjs.com/",
            "repository": {"type": "git", "url": "git+https://github.com/expressjs/express.git"},
            "author": {"name": "TJ Holowaychuk", "email": "tj@vision-media.ca"},
            "keywords": ["express", "framework"],
            "versions": {
                "4.17.0": {
                    "name": "express",
                    "version": "4.17.0",
                    "dependencies": {"accepts": "~1.3.7"}
                },
                "4.18.2": {
                    "name": "express",
                    "version": "4.18.2",
                    "description": "Fast web framework",
                    "dependencies": {"accepts": "~1.3.8", "debug": "2.6.9"},
                    "devDependencies": {"mocha": "10.2.0"},
                    "peerDependencies": {}
                }
            },
            "time": {"4.18.2": "2022-10-08T20:25:17.386Z"}
        }))
        .unwrap()
    }

    fn service(registry: MockRegistry) -> (NpmService, Arc<MockRegistry>) {
        let registry = Arc::new(registry);
        (NpmService::new(registry.clone()), registry)
    }

    fn registry() -> MockRegistry {
        MockRegistry::new()
            .document(express_document())
            .package("accepts", "1.3.8", &[("mime-types", "~2.1.34")])
            .package("mime-types", "2.1.35", &[])
            .package("debug", "4.3.4", &[("ms", "2.1.2")])
            .package("ms", "2.1.3", &[])
    }

    #[test]
    fn test_analyze_latest() {
        let (service, _) = service(registry());
        let analysis = service.analyze("express", None).unwrap();

        assert_eq!(analysis.name, "express");
        assert_eq!(analysis.version, "4.18.2");
        assert_eq!(analysis.latest_version, "4.18.2");
        assert_eq!(analysis.description, "Fast web framework");
        assert_eq!(analysis.license, "MIT");
        assert_eq!(analysis.repository, "https://github.com/expressjs/express");
        assert_eq!(analysis.author, "TJ Holowaychuk <tj@vision-media.ca>");
        assert_eq!(analysis.keywords, vec!["express", "framework"]);
        assert_eq!(analysis.publish_time, "2022-10-08T20:25:17.386Z");
        assert_eq!(analysis.dependency_count, 2);
        assert_eq!(analysis.dev_dependencies["mocha"], "10.2.0");
        assert!(analysis.peer_dependencies.is_empty());
    }

    #[test]
    fn test_analyze_explicit_version() {
        let (service, _) = service(registry());
        let analysis = service.analyze("express", Some("4.17.0")).unwrap();

        assert_eq!(analysis.version, "4.17.0");
        assert_eq!(analysis.latest_version, "4.18.2");
        // Falls back to the package-level description.
        assert_eq!(
            analysis.description,
            "Fast, unopinionated, minimalist web framework"
        );
        assert_eq!(analysis.publish_time, "");
        assert!(analysis.dev_dependencies.is_empty());
    }

    #[test]
    fn test_empty_package_name_rejected_before_fetch() {
        let (service, registry) = service(registry());
        assert!(matches!(
            service.analyze("  ", None),
            Err(NpmError::InvalidInput(_))
        ));
        assert!(matches!(
            service.dependency_tree("", None, None),
            Err(NpmError::InvalidInput(_))
        ));
        assert!(registry.calls().is_empty());
    }

    #[test]
    fn test_root_failures_are_fatal() {
        let (service, _) = service(registry().failing("flaky", NpmError::transport("reset")));

        assert!(matches!(
            service.dependency_tree("does-not-exist", None, None),
            Err(NpmError::NotFound(_))
        ));
        assert!(matches!(
            service.dependency_tree("flaky", None, None),
            Err(NpmError::Transport(_))
        ));
        assert!(matches!(
            service.dependency_tree("express", Some("0.0.1"), None),
            Err(NpmError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_root_without_latest_tag() {
        let document = PackageMetadata {
            name: "untagged".to_string(),
            ..Default::default()
        };
        let (service, _) = service(MockRegistry::new().document(document));
        assert_eq!(
            service.analyze("untagged", None).unwrap_err(),
            NpmError::NoLatestVersion("untagged".to_string())
        );
    }

    #[test]
    fn test_dependency_tree_report() {
        let (service, _) = service(registry());
        let report = service.dependency_tree("express", None, None).unwrap();

        assert_eq!(report.version, "4.18.2");
        assert_eq!(report.max_depth, 5);
        assert_eq!(report.total_dependencies, 4);
        assert_eq!(report.tree_depth, 2);

        // Dependencies resolve to their own latest, not the declared range.
        let debug = &report.dependency_tree["debug"];
        assert_eq!(debug.version_range, "2.6.9");
        assert_eq!(debug.version, "4.3.4");
        assert_eq!(debug.dependencies().unwrap()["ms"].version, "2.1.3");
    }

    #[test]
    fn test_dependency_tree_depth_clamped() {
        let (service, _) = service(registry());

        let report = service.dependency_tree("express", None, Some(1)).unwrap();
        assert_eq!(report.max_depth, 1);
        assert_eq!(report.tree_depth, 1);
        assert!(report.dependency_tree["accepts"].is_depth_limited());

        let report = service.dependency_tree("express", None, Some(42)).unwrap();
        assert_eq!(report.max_depth, 10);

        let report = service.dependency_tree("express", None, Some(-1)).unwrap();
        assert_eq!(report.max_depth, 5);
    }

    #[test]
    fn test_dependency_tree_partial_failure() {
        let (service, _) = service(registry().failing("ms", NpmError::Registry { status: 502 }));
        let report = service.dependency_tree("express", None, None).unwrap();

        let ms = &report.dependency_tree["debug"].dependencies().unwrap()["ms"];
        assert_eq!(ms.error(), Some("npm registry returned status code 502"));
        assert_eq!(report.total_dependencies, 4);
    }

    #[test]
    fn test_package_without_dependencies() {
        let (service, _) = service(MockRegistry::new().package("leaf", "1.0.0", &[]));
        let report = service.dependency_tree("leaf", None, None).unwrap();

        assert_eq!(report.total_dependencies, 0);
        assert_eq!(report.tree_depth, 0);
        assert!(report.dependency_tree.is_empty());
    }

    #[test]
    fn test_tree_timeout_marks_remaining_nodes() {
        let (service, registry) = service(registry());
        let service = service.with_tree_timeout(Some(Duration::ZERO));
        let report = service.dependency_tree("express", None, None).unwrap();

        assert!(report.dependency_tree["accepts"].error().is_some());
        assert_eq!(registry.calls(), vec!["express"]);
    }

    // Network tests (require actual internet connection, run with --ignored)
    fn live_service() -> NpmService {
        let client = NpmRegistryClient::new(
            crate::domains::npm::registry::DEFAULT_REGISTRY_URL,
            crate::domains::npm::registry::DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap();
        NpmService::new(Arc::new(client))
    }

    #[ignore]
    #[test]
    fn test_real_lodash_pinned_version() {
        let report = live_service()
            .dependency_tree("lodash", Some("4.17.21"), None)
            .unwrap();
        assert_eq!(report.name, "lodash");
        assert_eq!(report.version, "4.17.21");
        assert_eq!(report.total_dependencies, 0);
    }

    #[ignore]
    #[test]
    fn test_real_scoped_package() {
        let report = live_service()
            .dependency_tree("@types/node", None, Some(1))
            .unwrap();
        assert_eq!(report.name, "@types/node");
    }

    #[ignore]
    #[test]
    fn test_real_missing_package() {
        let err = live_service()
            .dependency_tree("this-package-definitely-does-not-exist-12345", None, None)
            .unwrap_err();
        assert!(matches!(err, NpmError::NotFound(_)));
    }
}
