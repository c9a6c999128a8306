//! buildview Core - Build Metadata Types
//!
//! Data types shared by every other crate in the workspace: validated
//! identifiers, typed storage keys, the build database model, the error
//! taxonomy, configuration, and the branch history projection.

pub mod build_db;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod keys;

pub use build_db::{BranchBuildRecord, BuildDatabase, BuildDate, BUILD_DATE_FIELD};
pub use config::{
    ResolverConfig, StorageConfig, DEFAULT_BRANCH, DEFAULT_README_FALLBACK,
    DEFAULT_RECENT_LOG_LIMIT, MAX_LMDB_SIZE_MB,
};
pub use error::{BuildviewError, BuildviewResult, ConfigError, DecodeError, KeyError, StoreError};
pub use history::{branch_history, history_order, BranchHistoryEntry};
pub use identity::{BranchName, RepoId};
pub use keys::{CacheKey, LogicalKey, ObjectPath};
