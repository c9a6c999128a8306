//! In-memory durable store for tests and fixtures.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use buildview_core::{ObjectPath, StoreError};

use super::DurableStore;

const BACKEND: &str = "memory-durable";

/// Durable store backed by a map of object paths to bytes.
#[derive(Debug, Default)]
pub struct InMemoryDurableStore {
    objects: RwLock<HashMap<ObjectPath, Vec<u8>>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, replacing any previous one.
    pub fn put(&self, path: &ObjectPath, bytes: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(|_| StoreError::io(BACKEND, "lock poisoned"))?
            .insert(path.clone(), bytes.into());
        Ok(())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn get(&self, path: &ObjectPath) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .map_err(|_| StoreError::io(BACKEND, "lock poisoned"))?
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildview_core::{BranchName, RepoId};

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryDurableStore::new();
        let repo = RepoId::parse("acme/tool").expect("valid repo");
        let path = ObjectPath::build_database(&repo);

        store.put(&path, b"{}".to_vec()).expect("put");
        assert_eq!(store.get(&path).await.expect("get"), b"{}".to_vec());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let store = InMemoryDurableStore::new();
        let repo = RepoId::parse("acme/tool").expect("valid repo");
        let branch = BranchName::parse("main").expect("valid branch");

        let err = store
            .get(&ObjectPath::readme(&repo, &branch))
            .await
            .expect_err("object should be missing");
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }
}
