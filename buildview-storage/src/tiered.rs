//! Ordered fallback across storage tiers.
//!
//! A [`TieredLookup`] holds a list of [`BlobTier`]s and asks each, in order,
//! for the bytes behind a [`LogicalKey`]. The first non-empty payload wins.
//! A miss or an I/O failure on one tier falls through to the next; running
//! out of tiers is a clean absence.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use buildview_core::{LogicalKey, StoreError};
use serde::Serialize;

use crate::cache::CacheStore;
use crate::durable::DurableStore;

/// Why a tier did not produce bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    /// The tier has no data for the key.
    #[error("not found")]
    NotFound,

    /// The tier could not be queried.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<StoreError> for TierError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => TierError::NotFound,
            other => TierError::Io(other.to_string()),
        }
    }
}

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TierSource {
    Cache,
    Durable,
}

impl fmt::Display for TierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierSource::Cache => f.write_str("cache"),
            TierSource::Durable => f.write_str("durable"),
        }
    }
}

/// One backend in a resolution chain.
#[async_trait]
pub trait BlobTier: Send + Sync {
    /// Identifies this tier in logs and results.
    fn source(&self) -> TierSource;

    /// Fetch the bytes for `key` from this tier's namespace.
    async fn fetch(&self, key: &LogicalKey) -> Result<Vec<u8>, TierError>;
}

/// Cache tier: maps a logical key to its cache key.
pub struct CacheTier<C: CacheStore + ?Sized> {
    store: Arc<C>,
}

impl<C: CacheStore + ?Sized> CacheTier<C> {
    pub fn new(store: Arc<C>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<C: CacheStore + ?Sized> BlobTier for CacheTier<C> {
    fn source(&self) -> TierSource {
        TierSource::Cache
    }

    async fn fetch(&self, key: &LogicalKey) -> Result<Vec<u8>, TierError> {
        match self.store.get(&key.cache_key()).await? {
            Some(bytes) => Ok(bytes),
            None => Err(TierError::NotFound),
        }
    }
}

/// Durable tier: maps a logical key to its object path.
pub struct DurableTier<D: DurableStore + ?Sized> {
    store: Arc<D>,
}

impl<D: DurableStore + ?Sized> DurableTier<D> {
    pub fn new(store: Arc<D>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<D: DurableStore + ?Sized> BlobTier for DurableTier<D> {
    fn source(&self) -> TierSource {
        TierSource::Durable
    }

    async fn fetch(&self, key: &LogicalKey) -> Result<Vec<u8>, TierError> {
        Ok(self.store.get(&key.object_path()).await?)
    }
}

/// Bytes produced by a tiered lookup, with the tier that served them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredRead {
    pub bytes: Vec<u8>,
    pub source: TierSource,
}

/// Ordered chain of tiers, tried first to last.
#[derive(Clone, Default)]
pub struct TieredLookup {
    tiers: Vec<Arc<dyn BlobTier>>,
}

impl TieredLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard chain: cache first, durable store as fallback.
    pub fn cache_then_durable<C, D>(cache: Arc<C>, durable: Arc<D>) -> Self
    where
        C: CacheStore + ?Sized + 'static,
        D: DurableStore + ?Sized + 'static,
    {
        Self::new()
            .with_tier(Arc::new(CacheTier::new(cache)))
            .with_tier(Arc::new(DurableTier::new(durable)))
    }

    /// Append a tier to the end of the chain.
    pub fn with_tier(mut self, tier: Arc<dyn BlobTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Sources of the configured tiers, in lookup order.
    pub fn sources(&self) -> Vec<TierSource> {
        self.tiers.iter().map(|tier| tier.source()).collect()
    }

    /// Resolve `key` against the chain.
    ///
    /// Each tier is queried at most once. Empty payloads count as a miss.
    /// Returns `None` when no tier has data, including when the last tier
    /// fails.
    pub async fn resolve(&self, key: &LogicalKey) -> Option<TieredRead> {
        let last = self.tiers.len().saturating_sub(1);

        for (position, tier) in self.tiers.iter().enumerate() {
            let source = tier.source();
            match tier.fetch(key).await {
                Ok(bytes) if !bytes.is_empty() => {
                    tracing::debug!(key = %key, tier = %source, "Tier hit");
                    return Some(TieredRead { bytes, source });
                }
                Ok(_) | Err(TierError::NotFound) => {
                    tracing::debug!(key = %key, tier = %source, "Tier miss");
                }
                Err(TierError::Io(reason)) if position < last => {
                    tracing::warn!(
                        key = %key,
                        tier = %source,
                        error = %reason,
                        "Tier unavailable, falling back"
                    );
                }
                Err(TierError::Io(reason)) => {
                    tracing::error!(
                        key = %key,
                        tier = %source,
                        error = %reason,
                        "Last tier unavailable, treating as not found"
                    );
                }
            }
        }

        None
    }
}

impl fmt::Debug for TieredLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredLookup")
            .field("tiers", &self.sources())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
