//! In-memory cache store.
//!
//! Used for tests and single-process deployments. Values and log indexes
//! live behind `RwLock`s; a poisoned lock is reported as an I/O failure of
//! the backend rather than a panic.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use buildview_core::{CacheKey, StoreError};

use super::traits::{window, CacheStats, CacheStore, StatsCounters};

const BACKEND: &str = "memory-cache";

/// Cache store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    values: RwLock<HashMap<CacheKey, Vec<u8>>>,
    /// Log indexes: index key -> member -> score.
    logs: RwLock<HashMap<CacheKey, HashMap<String, i64>>>,
    stats: StatsCounters,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one.
    pub fn put(&self, key: &CacheKey, value: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        self.values
            .write()
            .map_err(|_| poisoned())?
            .insert(key.clone(), value.into());
        Ok(())
    }

    /// Remove a value. Returns whether it existed.
    pub fn remove(&self, key: &CacheKey) -> Result<bool, StoreError> {
        Ok(self
            .values
            .write()
            .map_err(|_| poisoned())?
            .remove(key)
            .is_some())
    }

    /// Add a member to a log index, or move it to a new score.
    pub fn add_log(
        &self,
        key: &CacheKey,
        score: i64,
        member: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.logs
            .write()
            .map_err(|_| poisoned())?
            .entry(key.clone())
            .or_default()
            .insert(member.into(), score);
        Ok(())
    }

    /// Lookup statistics since creation.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError> {
        let values = self.values.read().map_err(|_| {
            self.stats.record_error();
            poisoned()
        })?;
        let value = values.get(key).cloned();
        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        Ok(value)
    }

    async fn rev_range(
        &self,
        key: &CacheKey,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError> {
        let logs = self.logs.read().map_err(|_| poisoned())?;
        let Some(index) = logs.get(key) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(&String, i64)> =
            index.iter().map(|(member, score)| (member, *score)).collect();
        // Highest score first, equal scores by member descending.
        members.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));

        Ok(window(
            members.into_iter().map(|(m, _)| m.clone()).collect(),
            start,
            stop,
        ))
    }
}

fn poisoned() -> StoreError {
    StoreError::io(BACKEND, "lock poisoned")
}
