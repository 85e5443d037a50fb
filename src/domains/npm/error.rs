//! npm-specific error types.

use thiserror::Error;

/// Errors that can occur while looking up or analyzing npm packages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NpmError {
    /// The caller supplied unusable input (e.g. an empty package name).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The registry has no package with this name.
    #[error("package '{0}' not found in npm registry")]
    NotFound(String),

    /// The registry answered with a non-success status other than 404.
    #[error("npm registry returned status code {status}")]
    Registry { status: u16 },

    /// Network-level failure: DNS, connect, timeout or a truncated body.
    #[error("failed to fetch package information: {0}")]
    Transport(String),

    /// The registry response was not well-formed metadata.
    #[error("failed to parse npm registry response: {0}")]
    Parse(String),

    /// No explicit version was requested and the package has no `latest` tag.
    #[error("no latest version found for package '{0}'")]
    NoLatestVersion(String),

    /// The resolved version is not among the published versions.
    #[error("version '{version}' not found for package '{package}'")]
    VersionNotFound { version: String, package: String },
}

impl NpmError {
    /// Create a new "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
