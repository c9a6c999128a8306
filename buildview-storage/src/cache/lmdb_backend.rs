//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key/value tier that several processes on one host can share.
//!
//! # Layout
//!
//! Three named databases live in one environment:
//! - `values`: cache key bytes -> value bytes
//! - `logs`: `index ‖ 0xFF ‖ score ‖ member` -> empty, ordered so a reverse
//!   prefix scan yields the most recent member first
//! - `log_members`: `index ‖ 0xFF ‖ member` -> score, so re-adding a member
//!   moves it instead of duplicating it
//!
//! Cache keys are UTF-8 and therefore never contain `0xFF`, which makes the
//! separator unambiguous.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Reads use read transactions, writes use
//! write transactions, and statistics are kept in atomic counters.

use std::path::Path;

use async_trait::async_trait;
use buildview_core::{CacheKey, StorageConfig, StoreError};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{window, CacheStats, CacheStore, StatsCounters};

const BACKEND: &str = "lmdb";

/// Separator byte between an index key and the rest of a log entry key.
const SEPARATOR: u8 = 0xFF;

/// Error type for opening the LMDB cache.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert LmdbCacheError to StoreError.
impl From<LmdbCacheError> for StoreError {
    fn from(e: LmdbCacheError) -> Self {
        StoreError::io(BACKEND, e)
    }
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// let store = LmdbCacheStore::new("/var/cache/buildview", 256)?;
/// store.put(&CacheKey::build_status(&repo), b"success")?;
/// let status = store.get(&CacheKey::build_status(&repo)).await?;
/// ```
pub struct LmdbCacheStore {
    env: Env,
    values: Database<Bytes, Bytes>,
    logs: Database<Bytes, Bytes>,
    log_members: Database<Bytes, Bytes>,
    stats: StatsCounters,
}

impl LmdbCacheStore {
    /// Open (or create) an LMDB cache store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            LmdbCacheError::EnvOpen(format!("map size of {max_size_mb} MB overflows"))
        })?;

        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(3)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let values: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("values"))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        let logs: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("logs"))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        let log_members: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("log_members"))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            values,
            logs,
            log_members,
            stats: StatsCounters::default(),
        })
    }

    /// Open the cache described by a storage configuration.
    pub fn open(config: &StorageConfig) -> Result<Self, LmdbCacheError> {
        Self::new(&config.lmdb_path, config.lmdb_max_size_mb)
    }

    /// Store a value, replacing any previous one.
    pub fn put(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(io)?;
        self.values
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(io)?;
        wtxn.commit().map_err(io)
    }

    /// Remove a value. Returns whether it existed.
    pub fn remove(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(io)?;
        let deleted = self.values.delete(&mut wtxn, key.as_bytes()).map_err(io)?;
        wtxn.commit().map_err(io)?;
        Ok(deleted)
    }

    /// Add a member to a log index, or move it to a new score.
    pub fn add_log(&self, key: &CacheKey, score: i64, member: &str) -> Result<(), StoreError> {
        let member_key = member_key(key, member);
        let mut wtxn = self.env.write_txn().map_err(io)?;

        let previous = self
            .log_members
            .get(&wtxn, &member_key)
            .map_err(io)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
            .map(i64::from_be_bytes);
        if let Some(old_score) = previous {
            self.logs
                .delete(&mut wtxn, &entry_key(key, old_score, member))
                .map_err(io)?;
        }

        self.logs
            .put(&mut wtxn, &entry_key(key, score, member), &[])
            .map_err(io)?;
        self.log_members
            .put(&mut wtxn, &member_key, &score.to_be_bytes())
            .map_err(io)?;

        wtxn.commit().map_err(io)
    }

    /// Lookup statistics since the store was opened.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn read_value(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(io)?;
        let value = self
            .values
            .get(&rtxn, key.as_bytes())
            .map_err(io)?
            .map(<[u8]>::to_vec);
        Ok(value)
    }

    fn read_log_members(&self, key: &CacheKey, limit: usize) -> Result<Vec<String>, StoreError> {
        let prefix = index_prefix(key);
        let rtxn = self.env.read_txn().map_err(io)?;
        let iter = self.logs.rev_prefix_iter(&rtxn, &prefix).map_err(io)?;

        let mut members = Vec::new();
        for entry in iter.take(limit) {
            let (entry_key, _) = entry.map_err(io)?;
            let member = &entry_key[prefix.len() + 8..];
            members.push(String::from_utf8_lossy(member).into_owned());
        }
        Ok(members)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError> {
        match self.read_value(key) {
            Ok(Some(value)) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            Ok(None) => {
                self.stats.record_miss();
                Ok(None)
            }
            Err(e) => {
                self.stats.record_error();
                Err(e)
            }
        }
    }

    async fn rev_range(
        &self,
        key: &CacheKey,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError> {
        if start > stop {
            return Ok(Vec::new());
        }
        let members = self.read_log_members(key, stop.saturating_add(1))?;
        Ok(window(members, start, stop))
    }
}

fn io(e: heed::Error) -> StoreError {
    StoreError::io(BACKEND, e)
}

fn index_prefix(key: &CacheKey) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(key.as_bytes().len() + 1);
    prefix.extend_from_slice(key.as_bytes());
    prefix.push(SEPARATOR);
    prefix
}

/// Map a signed score onto bytes whose lexicographic order matches numeric order.
fn score_bytes(score: i64) -> [u8; 8] {
    ((score as u64) ^ (1 << 63)).to_be_bytes()
}

fn entry_key(key: &CacheKey, score: i64, member: &str) -> Vec<u8> {
    let mut bytes = index_prefix(key);
    bytes.extend_from_slice(&score_bytes(score));
    bytes.extend_from_slice(member.as_bytes());
    bytes
}

fn member_key(key: &CacheKey, member: &str) -> Vec<u8> {
    let mut bytes = index_prefix(key);
    bytes.extend_from_slice(member.as_bytes());
    bytes
}
