//! npm registry client.
//!
//! Fetches a package document (all versions, dist-tags, publish times) from an
//! npm-compatible registry. Every lookup is a single GET with no retries and no
//! caching; the caller decides whether a failure is fatal.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::NpmError;
use super::version::select_version;
use crate::core::config::NpmConfig;

/// Public npm registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Timeout applied to each registry request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Registry Documents
// ============================================================================

/// Package document as published by the registry.
///
/// Fields whose shape differs between packages (`license`, `repository`,
/// `author`, `keywords`) are kept raw and normalized by [`super::metadata`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,

    #[serde(default)]
    pub license: serde_json::Value,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(default)]
    pub repository: serde_json::Value,

    #[serde(default)]
    pub author: serde_json::Value,

    #[serde(default)]
    pub keywords: serde_json::Value,

    #[serde(default)]
    pub versions: HashMap<String, VersionManifest>,

    /// Version -> publish timestamp. Also carries `created`/`modified` and,
    /// for unpublished packages, a non-string `unpublished` entry.
    #[serde(default)]
    pub time: HashMap<String, serde_json::Value>,
}

impl PackageMetadata {
    /// The version the `latest` dist-tag points at, if any.
    pub fn latest_version(&self) -> Option<&str> {
        self.dist_tags
            .get("latest")
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Publish timestamp of `version`, if the registry recorded one.
    pub fn publish_time(&self, version: &str) -> Option<&str> {
        self.time.get(version).and_then(|t| t.as_str())
    }
}

/// The manifest of one published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, String>>,

    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: Option<BTreeMap<String, String>>,

    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: Option<BTreeMap<String, String>>,
}

/// Metadata plus the version selected for analysis.
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    pub metadata: PackageMetadata,
    pub version: String,
}

// ============================================================================
// Registry Trait
// ============================================================================

/// A source of npm package metadata.
pub trait PackageRegistry: Send + Sync {
    /// Fetch the full package document for `name`.
    fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, NpmError>;

    /// Fetch `name` and pick the version to analyze.
    ///
    /// An explicit (non-empty) `version` wins; otherwise the `latest`
    /// dist-tag is used. The version is not checked against the published
    /// versions here, see [`super::version::manifest_for`].
    fn fetch(&self, name: &str, version: Option<&str>) -> Result<FetchedPackage, NpmError> {
        let metadata = self.fetch_metadata(name)?;
        let version = select_version(&metadata, name, version)?;
        Ok(FetchedPackage { metadata, version })
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Blocking HTTP client for an npm-compatible registry.
#[derive(Debug, Clone)]
pub struct NpmRegistryClient {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl NpmRegistryClient {
    /// Create a client for `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NpmError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| NpmError::transport(format!("invalid registry URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(NpmError::transport(format!(
                "registry URL cannot be a base: {}",
                base_url
            )));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NpmError::transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Create a client from the npm section of the server configuration.
    pub fn from_config(config: &NpmConfig) -> Result<Self, NpmError> {
        Self::new(
            &config.registry_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// URL of the package document; the name is a single escaped path segment.
    pub fn package_url(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }
}

impl PackageRegistry for NpmRegistryClient {
    fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, NpmError> {
        let url = self.package_url(name);
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| NpmError::transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NpmError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            warn!("Registry returned {} for {}", status, name);
            return Err(NpmError::Registry {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| NpmError::transport(format!("failed to read response body: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| NpmError::parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> NpmRegistryClient {
        NpmRegistryClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_package_url_plain_name() {
        let client = client(DEFAULT_REGISTRY_URL);
        assert_eq!(
            client.package_url("express").as_str(),
            "https://registry.npmjs.org/express"
        );
    }

    #[test]
    fn test_package_url_escapes_scoped_name() {
        let client = client("https://registry.npmjs.org/");
        assert_eq!(
            client.package_url("@types/node").as_str(),
            "https://registry.npmjs.org/@types%2Fnode"
        );
    }

    #[test]
    fn test_package_url_keeps_base_path() {
        let client = client("https://npm.example.com/repository/npm/");
        assert_eq!(
            client.package_url("lodash").as_str(),
            "https://npm.example.com/repository/npm/lodash"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            NpmRegistryClient::new("not a url", DEFAULT_REQUEST_TIMEOUT),
            Err(NpmError::Transport(_))
        ));
        assert!(NpmRegistryClient::new("mailto:npm@example.com", DEFAULT_REQUEST_TIMEOUT).is_err());
    }

    #[test]
    fn test_metadata_tolerates_odd_shapes() {
        let json = r#"{
            "name": "odd",
            "description": null,
            "license": {"type": "MIT"},
            "keywords": "a, b",
            "dist-tags": {"latest": "1.0.0"},
            "versions": {"1.0.0": {"name": "odd", "version": "1.0.0"}},
            "time": {"1.0.0": "2020-01-01T00:00:00.000Z", "unpublished": {"time": "x"}}
        }"#;
        let metadata: PackageMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.latest_version(), Some("1.0.0"));
        assert_eq!(metadata.publish_time("1.0.0"), Some("2020-01-01T00:00:00.000Z"));
        assert_eq!(metadata.publish_time("unpublished"), None);
        assert!(metadata.versions["1.0.0"].dependencies.is_none());
    }

    /// Runs a blocking registry call off the async runtime.
    async fn fetch_blocking(base: String, name: &'static str) -> Result<PackageMetadata, NpmError> {
        tokio::task::spawn_blocking(move || client(&base).fetch_metadata(name))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_metadata_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "left-pad",
                "dist-tags": {"latest": "1.3.0"},
                "versions": {"1.3.0": {"name": "left-pad", "version": "1.3.0"}}
            })))
            .mount(&server)
            .await;

        let metadata = fetch_blocking(server.uri(), "left-pad").await.unwrap();
        assert_eq!(metadata.name, "left-pad");
        assert_eq!(metadata.latest_version(), Some("1.3.0"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_metadata_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_blocking(server.uri(), "missing").await.unwrap_err();
        assert_eq!(err, NpmError::NotFound("missing".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_metadata_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetch_blocking(server.uri(), "broken").await.unwrap_err();
        assert_eq!(err, NpmError::Registry { status: 503 });
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_metadata_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = fetch_blocking(server.uri(), "garbled").await.unwrap_err();
        assert!(matches!(err, NpmError::Parse(_)));
    }

    #[test]
    fn test_fetch_metadata_transport_error() {
        // Nothing listens on port 9 of the loopback interface.
        let err = client("http://127.0.0.1:9").fetch_metadata("anything").unwrap_err();
        assert!(matches!(err, NpmError::Transport(_)));
    }

    // Network tests (require actual internet connection, run with --ignored)
    #[ignore]
    #[test]
    fn test_fetch_real_scoped_package() {
        let fetched = client(DEFAULT_REGISTRY_URL)
            .fetch("@types/node", None)
            .unwrap();
        assert_eq!(fetched.metadata.name, "@types/node");
        assert!(!fetched.version.is_empty());
    }
}
