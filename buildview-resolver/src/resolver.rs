//! Repository metadata resolution.
//!
//! A resolution starts from the build status in the cache. Without one the
//! repository has no builds and resolution stops. With one, the build
//! database, the auxiliary cache signals, and the README are fetched
//! concurrently. Only a corrupt build database can fail a resolution; every
//! other missing or unreachable piece falls back to its default.

use std::sync::Arc;

use buildview_core::{
    branch_history, BranchName, BuildDatabase, CacheKey, LogicalKey, ObjectPath, RepoId,
    ResolverConfig, StorageConfig,
};
use buildview_storage::{
    CacheStore, DurableStore, FsDurableStore, LmdbCacheStore, TierSource, TieredLookup,
};
use tracing::Instrument;

use crate::error::{ResolverError, ResolverResult};
use crate::view::{RepositoryView, ViewOutcome};

/// Outcome of resolving a repository's build database.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseLookup {
    /// Decoded database and the tier that served it.
    Found {
        database: BuildDatabase,
        source: TierSource,
    },
    /// No tier has a database for the repository.
    NotFound,
}

/// Resolves everything shown on a repository page.
///
/// Holds shared handles to the two stores and no per-request state, so one
/// resolver can serve many concurrent resolutions.
pub struct MetadataResolver<C: ?Sized, D: ?Sized> {
    cache: Arc<C>,
    durable: Arc<D>,
    config: ResolverConfig,
    lookup: TieredLookup,
}

impl<C: ?Sized, D: ?Sized> Clone for MetadataResolver<C, D> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            durable: Arc::clone(&self.durable),
            config: self.config.clone(),
            lookup: self.lookup.clone(),
        }
    }
}

impl MetadataResolver<LmdbCacheStore, FsDurableStore> {
    /// Open the LMDB cache and filesystem durable store described by `storage`.
    pub fn open(storage: &StorageConfig, config: ResolverConfig) -> ResolverResult<Self> {
        storage.validate()?;
        config.validate()?;

        let cache = Arc::new(LmdbCacheStore::open(storage)?);
        let durable = Arc::new(FsDurableStore::from_config(storage));

        tracing::info!(
            lmdb_path = %storage.lmdb_path.display(),
            durable_root = %storage.durable_root.display(),
            "Opened storage tiers"
        );

        Ok(Self::new(cache, durable, config))
    }
}

impl<C, D> MetadataResolver<C, D>
where
    C: CacheStore + ?Sized + 'static,
    D: DurableStore + ?Sized + 'static,
{
    /// Create a resolver reading through `cache` then `durable`.
    pub fn new(cache: Arc<C>, durable: Arc<D>, config: ResolverConfig) -> Self {
        let lookup = TieredLookup::cache_then_durable(Arc::clone(&cache), Arc::clone(&durable));
        Self {
            cache,
            durable,
            config,
            lookup,
        }
    }

    /// Replace the build database resolution chain.
    pub fn with_lookup(mut self, lookup: TieredLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the full repository view for `branch`, or the default branch.
    pub async fn resolve_view(
        &self,
        repo: &RepoId,
        branch: Option<&BranchName>,
    ) -> ResolverResult<ViewOutcome> {
        let branch = branch
            .cloned()
            .unwrap_or_else(|| self.config.default_branch.clone());
        let span = tracing::info_span!("resolve_view", repo = %repo, branch = %branch);

        self.assemble_view(repo, branch).instrument(span).await
    }

    async fn assemble_view(
        &self,
        repo: &RepoId,
        branch: BranchName,
    ) -> ResolverResult<ViewOutcome> {
        let Some(build_status) = self.resolve_status(repo).await else {
            return Ok(ViewOutcome::NoBuild { repo: repo.clone() });
        };

        let (database, build_duration, signature, recent_logs, readme) = tokio::join!(
            self.resolve_build_database(repo),
            self.resolve_duration(repo),
            self.resolve_signature(repo, &branch),
            self.resolve_recent_logs(repo),
            self.resolve_readme(repo, &branch),
        );

        let (database, database_source) = match database? {
            DatabaseLookup::Found { database, source } => (Some(database), Some(source)),
            DatabaseLookup::NotFound => (None, None),
        };

        let history = database.as_ref().map(branch_history).unwrap_or_default();
        let branch_record = database
            .as_ref()
            .and_then(|db| db.get(branch.as_str()).cloned());

        tracing::debug!(
            has_builds = database.is_some(),
            branches = history.len(),
            logs = recent_logs.len(),
            "Resolved repository view"
        );

        Ok(ViewOutcome::Ready(RepositoryView {
            repo: repo.clone(),
            branch,
            branch_record,
            build_status,
            build_duration,
            signature,
            readme,
            has_builds: database.is_some(),
            database_source,
            history,
            recent_logs,
        }))
    }

    /// Resolve and decode the repository's build database.
    ///
    /// Absence from every tier is `DatabaseLookup::NotFound`. Bytes that do
    /// not decode are `ResolverError::Decode`.
    pub async fn resolve_build_database(&self, repo: &RepoId) -> ResolverResult<DatabaseLookup> {
        let key = LogicalKey::BuildDatabase(repo.clone());
        let Some(read) = self.lookup.resolve(&key).await else {
            tracing::debug!(repo = %repo, "No build database in any tier");
            return Ok(DatabaseLookup::NotFound);
        };

        match BuildDatabase::decode(&read.bytes) {
            Ok(database) => Ok(DatabaseLookup::Found {
                database,
                source: read.source,
            }),
            Err(source) => {
                tracing::error!(
                    repo = %repo,
                    tier = %read.source,
                    error = %source,
                    "Failed to decode build database"
                );
                Err(ResolverError::Decode {
                    repo: repo.clone(),
                    source,
                })
            }
        }
    }

    /// Build status, or `None` when the repository has never been built.
    ///
    /// A present but empty value still counts as a status.
    pub async fn resolve_status(&self, repo: &RepoId) -> Option<String> {
        let key = CacheKey::build_status(repo);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => Some(lossy(bytes)),
            Ok(None) => {
                tracing::warn!(repo = %repo, key = %key, "No build status known");
                None
            }
            Err(e) => {
                tracing::warn!(repo = %repo, key = %key, error = %e, "Failed to read build status");
                None
            }
        }
    }

    /// Last build duration in seconds. `0` when missing, empty or not a number.
    pub async fn resolve_duration(&self, repo: &RepoId) -> i64 {
        let key = CacheKey::build_duration(repo);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => parse_duration(&bytes),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(repo = %repo, key = %key, error = %e, "Failed to read build duration");
                0
            }
        }
    }

    /// Artifact signature of `branch`, or an empty string.
    pub async fn resolve_signature(&self, repo: &RepoId, branch: &BranchName) -> String {
        let key = CacheKey::signature(repo, branch);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => lossy(bytes),
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(repo = %repo, key = %key, error = %e, "Failed to read signature");
                String::new()
            }
        }
    }

    /// Most recent build log identifiers, newest first, capped at the
    /// configured limit.
    pub async fn resolve_recent_logs(&self, repo: &RepoId) -> Vec<String> {
        let limit = self.config.recent_log_limit;
        if limit == 0 {
            return Vec::new();
        }

        let key = CacheKey::logs(repo);
        match self.cache.rev_range(&key, 0, limit - 1).await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::error!(repo = %repo, key = %key, error = %e, "Unable to load last logs");
                Vec::new()
            }
        }
    }

    /// README of `branch` from the durable store, or the configured fallback.
    pub async fn resolve_readme(&self, repo: &RepoId, branch: &BranchName) -> String {
        let path = ObjectPath::readme(repo, branch);
        match self.durable.get(&path).await {
            Ok(bytes) => lossy(bytes),
            Err(e) if e.is_not_found() => {
                tracing::debug!(repo = %repo, path = %path, "No README provided");
                self.config.readme_fallback.clone()
            }
            Err(e) => {
                tracing::warn!(repo = %repo, path = %path, error = %e, "Failed to read README");
                self.config.readme_fallback.clone()
            }
        }
    }
}

/// Parse a decimal duration with an optional sign. Anything else is `0`.
fn parse_duration(bytes: &[u8]) -> i64 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .unwrap_or(0)
}

fn lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use buildview_core::DEFAULT_README_FALLBACK;
    use buildview_storage::{InMemoryCacheStore, InMemoryDurableStore};

    fn repo() -> RepoId {
        RepoId::parse("acme/tool").expect("valid repo")
    }

    fn resolver() -> (
        MetadataResolver<InMemoryCacheStore, InMemoryDurableStore>,
        Arc<InMemoryCacheStore>,
        Arc<InMemoryDurableStore>,
    ) {
        let cache = Arc::new(InMemoryCacheStore::new());
        let durable = Arc::new(InMemoryDurableStore::new());
        let resolver = MetadataResolver::new(
            Arc::clone(&cache),
            Arc::clone(&durable),
            ResolverConfig::default(),
        );
        (resolver, cache, durable)
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(b"42"), 42);
        assert_eq!(parse_duration(b"+7"), 7);
        assert_eq!(parse_duration(b"-3"), -3);
        assert_eq!(parse_duration(b""), 0);
        assert_eq!(parse_duration(b"4.2"), 0);
        assert_eq!(parse_duration(b" 42"), 0);
        assert_eq!(parse_duration(b"forty-two"), 0);
        assert_eq!(parse_duration(&[0xff, 0x34]), 0);
        assert_eq!(parse_duration(b"99999999999999999999"), 0);
    }

    #[test]
    fn test_lossy_replaces_invalid_utf8() {
        assert_eq!(lossy(b"ok".to_vec()), "ok");
        assert_eq!(lossy(vec![b'a', 0xff, b'b']), "a\u{FFFD}b");
    }

    #[tokio::test]
    async fn test_empty_status_still_counts() {
        let (resolver, cache, _) = resolver();
        cache.put(&CacheKey::build_status(&repo()), "").expect("put");

        assert_eq!(resolver.resolve_status(&repo()).await, Some(String::new()));
        let outcome = resolver.resolve_view(&repo(), None).await.expect("resolve");
        assert!(outcome.is_ready());
    }

    #[tokio::test]
    async fn test_readme_from_durable_store() {
        let (resolver, _, durable) = resolver();
        let branch = BranchName::parse("dev").expect("valid branch");
        durable
            .put(&ObjectPath::readme(&repo(), &branch), "# Dev")
            .expect("put");

        assert_eq!(resolver.resolve_readme(&repo(), &branch).await, "# Dev");
        let master = resolver.config().default_branch.clone();
        assert_eq!(
            resolver.resolve_readme(&repo(), &master).await,
            DEFAULT_README_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_recent_logs_respect_configured_limit() {
        let (resolver, cache, _) = resolver();
        let key = CacheKey::logs(&repo());
        for i in 0..5 {
            cache
                .add_log(&key, i, format!("log-{}", i))
                .expect("add");
        }

        let resolver = MetadataResolver {
            config: ResolverConfig::default().with_recent_log_limit(2),
            ..resolver
        };
        assert_eq!(resolver.resolve_recent_logs(&repo()).await, vec!["log-4", "log-3"]);

        let resolver = MetadataResolver {
            config: ResolverConfig::default().with_recent_log_limit(0),
            ..resolver
        };
        assert!(resolver.resolve_recent_logs(&repo()).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_is_cloneable_across_tasks() {
        let (resolver, cache, _) = resolver();
        cache
            .put(&CacheKey::build_status(&repo()), "success")
            .expect("put");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve_view(&repo(), None).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.expect("join").expect("resolve");
            assert!(outcome.is_ready());
        }
    }
}
