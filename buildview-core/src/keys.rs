//! Typed storage keys.
//!
//! Producers and the resolver share these constructors so the cache key
//! namespace and the durable path namespace cannot drift apart. A `CacheKey`
//! or `ObjectPath` can only be built from validated identifiers.
//!
//! # Cache namespace
//!
//! ```text
//! project::{repo}::build-status
//! project::{repo}::build-duration
//! project::{repo}::signatures::{branch}
//! project::{repo}::logs
//! project::{repo}::builddb
//! ```
//!
//! # Durable namespace
//!
//! ```text
//! {repo}/build.db
//! {repo}/{branch}_README.md
//! ```

use std::fmt;

use crate::identity::{BranchName, RepoId};

const PROJECT_PREFIX: &str = "project";

/// Key into the low-latency cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    fn project(repo: &RepoId, suffix: &str) -> Self {
        Self(format!("{}::{}::{}", PROJECT_PREFIX, repo, suffix))
    }

    /// `project::{repo}::build-status`
    pub fn build_status(repo: &RepoId) -> Self {
        Self::project(repo, "build-status")
    }

    /// `project::{repo}::build-duration`
    pub fn build_duration(repo: &RepoId) -> Self {
        Self::project(repo, "build-duration")
    }

    /// `project::{repo}::signatures::{branch}`
    pub fn signature(repo: &RepoId, branch: &BranchName) -> Self {
        Self::project(repo, &format!("signatures::{}", branch))
    }

    /// `project::{repo}::logs` (time-ordered log index)
    pub fn logs(repo: &RepoId) -> Self {
        Self::project(repo, "logs")
    }

    /// `project::{repo}::builddb`
    pub fn build_database(repo: &RepoId) -> Self {
        Self::project(repo, "builddb")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of an object in the durable store, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// `{repo}/build.db`
    pub fn build_database(repo: &RepoId) -> Self {
        Self(format!("{}/build.db", repo))
    }

    /// `{repo}/{branch}_README.md`
    pub fn readme(repo: &RepoId, branch: &BranchName) -> Self {
        Self(format!("{}/{}_README.md", repo, branch))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated components of the path.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A logical blob, independent of which tier ends up serving it.
///
/// Every tier in a resolution chain maps the logical key into its own
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    /// The per-repository build database.
    BuildDatabase(RepoId),
}

impl LogicalKey {
    /// Key of this blob in the cache tier.
    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::BuildDatabase(repo) => CacheKey::build_database(repo),
        }
    }

    /// Path of this blob in the durable tier.
    pub fn object_path(&self) -> ObjectPath {
        match self {
            Self::BuildDatabase(repo) => ObjectPath::build_database(repo),
        }
    }

    /// Repository the blob belongs to.
    pub fn repo(&self) -> &RepoId {
        match self {
            Self::BuildDatabase(repo) => repo,
        }
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildDatabase(repo) => write!(f, "build database of {}", repo),
        }
    }
}
