//! Error types for buildview operations

use thiserror::Error;

/// Identifier validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid repository identifier {value:?}: {reason}")]
    InvalidRepo { value: String, reason: String },

    #[error("Invalid branch name {value:?}: {reason}")]
    InvalidBranch { value: String, reason: String },
}

/// Storage adapter errors.
///
/// `NotFound` is a clean absence. `Io` covers every transient failure of
/// the backend (connectivity, timeouts, transaction errors).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("I/O error in {backend} backend: {reason}")]
    Io { backend: String, reason: String },
}

impl StoreError {
    /// Build an `Io` error for the named backend.
    pub fn io(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Io {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `NotFound` error for the given key or path.
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Returns true if this is a clean absence rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Build database decoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed build database: {reason}")]
    Malformed { reason: String },

    #[error("Branch {branch:?} appears more than once")]
    DuplicateBranch { branch: String },

    #[error("Branch {branch:?} has no build date")]
    MissingBuildDate { branch: String },

    #[error("Branch {branch:?} has an invalid build date: {reason}")]
    InvalidBuildDate { branch: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all buildview errors.
#[derive(Debug, Clone, Error)]
pub enum BuildviewError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for buildview operations.
pub type BuildviewResult<T> = Result<T, BuildviewError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_not_found() {
        let err = StoreError::not_found("acme/tool/build.db");
        let msg = format!("{}", err);
        assert!(msg.contains("Object not found"));
        assert!(msg.contains("acme/tool/build.db"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_store_error_display_io() {
        let err = StoreError::io("lmdb", "map full");
        let msg = format!("{}", err);
        assert!(msg.contains("lmdb"));
        assert!(msg.contains("map full"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_decode_error_display_duplicate_branch() {
        let err = DecodeError::DuplicateBranch {
            branch: "master".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("master"));
        assert!(msg.contains("more than once"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "BUILDVIEW_RECENT_LOG_LIMIT".to_string(),
            value: "many".to_string(),
            reason: "must be a positive integer".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("BUILDVIEW_RECENT_LOG_LIMIT"));
        assert!(msg.contains("many"));
        assert!(msg.contains("must be a positive integer"));
    }

    #[test]
    fn test_buildview_error_from_variants() {
        let key = BuildviewError::from(KeyError::InvalidRepo {
            value: "".to_string(),
            reason: "empty".to_string(),
        });
        assert!(matches!(key, BuildviewError::Key(_)));

        let store = BuildviewError::from(StoreError::not_found("x"));
        assert!(matches!(store, BuildviewError::Store(_)));

        let decode = BuildviewError::from(DecodeError::Malformed {
            reason: "eof".to_string(),
        });
        assert!(matches!(decode, BuildviewError::Decode(_)));

        let config = BuildviewError::from(ConfigError::InvalidValue {
            field: "f".to_string(),
            value: "v".to_string(),
            reason: "r".to_string(),
        });
        assert!(matches!(config, BuildviewError::Config(_)));
    }
}
