//! Identity types for repositories and branches
//!
//! Both identifiers end up embedded in cache keys (`project::{repo}::...`)
//! and in durable object paths (`{repo}/build.db`), so they are validated
//! once at construction and are immutable afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Separator used by the cache key namespace.
pub(crate) const NAMESPACE_SEPARATOR: &str = "::";

/// Validated repository identifier, e.g. `github.com/acme/tool` or `acme/tool`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId(String);

impl RepoId {
    /// Parse and validate a repository identifier.
    ///
    /// Rejects empty identifiers, leading or trailing `/`, empty, `.` or `..`
    /// segments, the `::` namespace separator, whitespace and control
    /// characters.
    pub fn parse(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        let invalid = |reason: &str| KeyError::InvalidRepo {
            value: value.clone(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.contains(NAMESPACE_SEPARATOR) {
            return Err(invalid("must not contain '::'"));
        }
        if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(invalid("must not contain whitespace or control characters"));
        }
        for segment in value.split('/') {
            match segment {
                "" => return Err(invalid("must not contain empty path segments")),
                "." | ".." => return Err(invalid("must not contain relative path segments")),
                _ => {}
            }
        }

        Ok(Self(value))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated segments of the identifier.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RepoId {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.0
    }
}

/// Validated branch name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Parse and validate a branch name.
    pub fn parse(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        let invalid = |reason: &str| KeyError::InvalidBranch {
            value: value.clone(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.contains(NAMESPACE_SEPARATOR) {
            return Err(invalid("must not contain '::'"));
        }
        if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(invalid("must not contain whitespace or control characters"));
        }
        if value.split('/').any(|segment| segment == "..") {
            return Err(invalid("must not contain '..' segments"));
        }

        Ok(Self(value))
    }

    /// Wrap a compile-time constant that is known to be valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::parse(value).is_ok());
        Self(value.to_string())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}
