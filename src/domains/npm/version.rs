//! Version selection for fetched package documents.
//!
//! Dependencies are always analyzed at their own `latest` version; the range a
//! parent declares is kept for display only and never narrows the choice.

use super::error::NpmError;
use super::registry::{PackageMetadata, VersionManifest};

/// Pick the version to analyze: the requested one, or the `latest` dist-tag.
///
/// An empty `requested` string is treated as absent.
pub fn select_version(
    metadata: &PackageMetadata,
    package: &str,
    requested: Option<&str>,
) -> Result<String, NpmError> {
    // Trimmed so " 4.17.21" from a hand-written tool call still matches a version key.
    match requested.map(str::trim).filter(|v| !v.is_empty()) {
        Some(version) => Ok(version.to_string()),
        None => metadata
            .latest_version()
            .map(str::to_string)
            .ok_or_else(|| NpmError::NoLatestVersion(package.to_string())),
    }
}

/// Look up the manifest of `version`.
pub fn manifest_for<'a>(
    metadata: &'a PackageMetadata,
    package: &str,
    version: &str,
) -> Result<&'a VersionManifest, NpmError> {
    metadata
        .versions
        .get(version)
        .ok_or_else(|| NpmError::VersionNotFound {
            version: version.to_string(),
            package: package.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(latest: Option<&str>, versions: &[&str]) -> PackageMetadata {
        let mut metadata = PackageMetadata {
            name: "pkg".to_string(),
            ..Default::default()
        };
        if let Some(latest) = latest {
            metadata
                .dist_tags
                .insert("latest".to_string(), latest.to_string());
        }
        for v in versions {
            metadata
                .versions
                .insert(v.to_string(), VersionManifest::default());
        }
        metadata
    }

    #[test]
    fn test_explicit_version_wins() {
        let m = metadata(Some("2.0.0"), &["1.0.0", "2.0.0"]);
        assert_eq!(select_version(&m, "pkg", Some("1.0.0")).unwrap(), "1.0.0");
        assert_eq!(select_version(&m, "pkg", Some(" 1.0.0 ")).unwrap(), "1.0.0");
    }

    #[test]
    fn test_falls_back_to_latest() {
        let m = metadata(Some("2.0.0"), &["2.0.0"]);
        assert_eq!(select_version(&m, "pkg", None).unwrap(), "2.0.0");
        assert_eq!(select_version(&m, "pkg", Some("")).unwrap(), "2.0.0");
        assert_eq!(select_version(&m, "pkg", Some("   ")).unwrap(), "2.0.0");
    }

    #[test]
    fn test_no_latest_tag() {
        let m = metadata(None, &["1.0.0"]);
        assert_eq!(
            select_version(&m, "pkg", None),
            Err(NpmError::NoLatestVersion("pkg".to_string()))
        );
    }

    #[test]
    fn test_manifest_lookup() {
        let m = metadata(Some("1.0.0"), &["1.0.0"]);
        assert!(manifest_for(&m, "pkg", "1.0.0").is_ok());

        let err = manifest_for(&m, "pkg", "9.9.9").unwrap_err();
        assert_eq!(
            err,
            NpmError::VersionNotFound {
                version: "9.9.9".to_string(),
                package: "pkg".to_string(),
            }
        );
        assert_eq!(err.to_string(), "version '9.9.9' not found for package 'pkg'");
    }
}
