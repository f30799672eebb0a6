//! Domain-specific errors for catalog and update operations

use thiserror::Error;
use updraft_schema::{PlatformError, ReleasesFileError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No version found matching tag '{tag}' (channel: {channel}, platform: {platform})")]
    VersionNotFound {
        tag: String,
        channel: String,
        platform: String,
    },

    #[error("Could not detect a platform from the request")]
    PlatformUndetected,

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("No asset '{filename}' in version {tag}")]
    AssetNotFound { tag: String, filename: String },

    #[error(transparent)]
    MalformedReleasesFile(#[from] ReleasesFileError),

    #[error("Invalid tag filter '{pattern}': {reason}")]
    InvalidTagFilter { pattern: String, reason: String },

    #[error("Cannot compare version '{value}': {reason}")]
    ComparatorFailure { value: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

impl CatalogError {
    /// Wrap a semver parse failure for `value`.
    pub fn comparator(value: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::ComparatorFailure {
            value: value.into(),
            reason: err.to_string(),
        }
    }
}

impl From<PlatformError> for CatalogError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Undetected => Self::PlatformUndetected,
            PlatformError::Unknown(name) => Self::UnknownPlatform(name),
        }
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line.
        Self::Backend(format!("{err:#}"))
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
