//! buildview Storage - Store Adapters and Tiered Lookup
//!
//! Adapters for the two storage tiers behind the resolver and the ordered
//! fallback chain that reads through them.
//!
//! - [`cache`]: the low-latency key/value tier ([`CacheStore`])
//! - [`durable`]: the authoritative object tier ([`DurableStore`])
//! - [`tiered`]: cache-then-durable resolution of logical keys

pub mod cache;
pub mod durable;
pub mod tiered;

pub use cache::{CacheStats, CacheStore, InMemoryCacheStore, LmdbCacheError, LmdbCacheStore};
pub use durable::{DurableStore, FsDurableStore, InMemoryDurableStore};
pub use tiered::{BlobTier, CacheTier, DurableTier, TierError, TierSource, TieredLookup, TieredRead};
