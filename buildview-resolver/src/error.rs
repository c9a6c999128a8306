//! Error types for metadata resolution

use buildview_core::{BuildviewError, ConfigError, DecodeError, KeyError, RepoId, StoreError};
use buildview_storage::LmdbCacheError;
use thiserror::Error;

/// Message shown when a stored build database cannot be read.
pub const CORRUPT_BUILD_MESSAGE: &str = "An unknown error occurred while getting your build.";

/// Errors surfaced by the resolver and its entry points.
///
/// Absence of data is never an error here; it is reported through
/// [`crate::ViewOutcome::NoBuild`] or an empty view instead.
#[derive(Debug, Clone, Error)]
pub enum ResolverError {
    /// The build database exists but its bytes could not be decoded.
    #[error("Corrupt build database for {repo}: {source}")]
    Decode {
        repo: RepoId,
        #[source]
        source: DecodeError,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// A store adapter could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ResolverError {
    /// Text suitable for showing to the person who asked for the view.
    pub fn user_message(&self) -> String {
        match self {
            ResolverError::Decode { .. } => CORRUPT_BUILD_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<LmdbCacheError> for ResolverError {
    fn from(e: LmdbCacheError) -> Self {
        ResolverError::Storage(e.into())
    }
}

impl From<ResolverError> for BuildviewError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::Decode { source, .. } => BuildviewError::Decode(source),
            ResolverError::Config(e) => BuildviewError::Config(e),
            ResolverError::Key(e) => BuildviewError::Key(e),
            ResolverError::Storage(e) => BuildviewError::Store(e),
        }
    }
}

/// Result type alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;
