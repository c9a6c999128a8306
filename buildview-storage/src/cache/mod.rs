//! Cache tier adapters.
//!
//! The cache is the low-latency tier: build status, build duration, per-branch
//! signatures, the recent-log index, and optionally a copy of the serialized
//! build database all live here, written by the CI pipeline and read by the
//! resolver.
//!
//! Two backends are provided:
//! - [`InMemoryCacheStore`] for tests and single-process use
//! - [`LmdbCacheStore`] for a shared, memory-mapped cache on one host
//!
//! # Example
//!
//! ```ignore
//! let cache = InMemoryCacheStore::new();
//! cache.put(&CacheKey::build_status(&repo), "success")?;
//! cache.add_log(&CacheKey::logs(&repo), 1_700_000_000, "log-1")?;
//!
//! let recent = cache.rev_range(&CacheKey::logs(&repo), 0, 10).await?;
//! ```

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use traits::{CacheStats, CacheStore};
