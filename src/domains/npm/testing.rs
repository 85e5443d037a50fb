//! In-memory registry used by the npm domain tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::error::NpmError;
use super::registry::{PackageMetadata, PackageRegistry, VersionManifest};

#[derive(Default)]
pub struct MockRegistry {
    packages: HashMap<String, PackageMetadata>,
    failures: HashMap<String, NpmError>,
    calls: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `name@version` as latest with the given dependencies.
    pub fn package(mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        let dependencies: BTreeMap<String, String> = deps
            .iter()
            .map(|(n, r)| (n.to_string(), r.to_string()))
            .collect();

        let metadata = self
            .packages
            .entry(name.to_string())
            .or_insert_with(|| PackageMetadata {
                name: name.to_string(),
                description: Some(format!("{} package", name)),
                ..Default::default()
            });
        metadata
            .dist_tags
            .insert("latest".to_string(), version.to_string());
        metadata.versions.insert(
            version.to_string(),
            VersionManifest {
                name: name.to_string(),
                version: version.to_string(),
                description: None,
                dependencies: Some(dependencies),
                dev_dependencies: None,
                peer_dependencies: None,
            },
        );
        self
    }

    /// Publish a full document as-is.
    pub fn document(mut self, metadata: PackageMetadata) -> Self {
        self.packages.insert(metadata.name.clone(), metadata);
        self
    }

    /// Make every lookup of `name` fail with `error`.
    pub fn failing(mut self, name: &str, error: NpmError) -> Self {
        self.failures.insert(name.to_string(), error);
        self
    }

    /// Names looked up so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }
}

impl PackageRegistry for MockRegistry {
    fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, NpmError> {
        self.calls.lock().unwrap().push(name.to_string());
        if let Some(err) = self.failures.get(name) {
            return Err(err.clone());
        }
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| NpmError::NotFound(name.to_string()))
    }
}
