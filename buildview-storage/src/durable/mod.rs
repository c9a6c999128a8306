//! Durable object store adapters.
//!
//! The durable tier holds the authoritative copy of each repository's build
//! database and its per-branch README files. Reads are slower than the cache
//! but never stale.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use buildview_core::{ObjectPath, StoreError};

pub use fs::FsDurableStore;
pub use memory::InMemoryDurableStore;

/// Authoritative blob store addressed by object path.
///
/// A missing object is `Err(StoreError::NotFound)`. Any other failure is
/// `Err(StoreError::Io)`.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read the full contents of the object at `path`.
    async fn get(&self, path: &ObjectPath) -> Result<Vec<u8>, StoreError>;
}
