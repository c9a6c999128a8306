//! Filesystem-backed durable store.
//!
//! Objects live under a root directory at their object path, so
//! `acme/tool/build.db` is read from `{root}/acme/tool/build.db`. Every read
//! is bounded by a timeout; an elapsed timeout is an I/O failure.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use buildview_core::{ObjectPath, StorageConfig, StoreError};

use super::DurableStore;

const BACKEND: &str = "filesystem";

/// Durable store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsDurableStore {
    root: PathBuf,
    timeout: Duration,
}

impl FsDurableStore {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    /// Build a store from the durable section of a storage configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.durable_root.clone(), config.durable_timeout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an object, creating parent directories as needed.
    pub async fn put(&self, path: &ObjectPath, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(BACKEND, e))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StoreError::io(BACKEND, e))
    }

    fn resolve(&self, path: &ObjectPath) -> PathBuf {
        path.components()
            .fold(self.root.clone(), |acc, component| acc.join(component))
    }
}

#[async_trait]
impl DurableStore for FsDurableStore {
    async fn get(&self, path: &ObjectPath) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path);
        match tokio::time::timeout(self.timeout, tokio::fs::read(&target)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(path)),
            Ok(Err(e)) => Err(StoreError::io(BACKEND, e)),
            Err(_) => Err(StoreError::io(
                BACKEND,
                format!("read of {} timed out after {:?}", path, self.timeout),
            )),
        }
    }
}
