//! buildview Test Utilities
//!
//! Centralized test infrastructure for the buildview workspace:
//! - Recording store doubles with call counters and injectable failures
//! - Proptest generators for identifiers and build databases
//! - Store fixtures for common resolution scenarios
//! - Custom assertions for history ordering and store errors

// Re-export store implementations the doubles wrap
pub use buildview_storage::{CacheStore, DurableStore, InMemoryCacheStore, InMemoryDurableStore};

// Re-export core types for convenience
pub use buildview_core::{
    branch_history, history_order, BranchBuildRecord, BranchHistoryEntry, BranchName,
    BuildDatabase, BuildDate, CacheKey, DecodeError, ObjectPath, RepoId, StoreError,
};

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

// ============================================================================
// RECORDING STORES
// ============================================================================

/// Cache store that records every call and can be told to fail.
///
/// Failures are reported as `StoreError::Io`, the same way a real backend
/// reports a connectivity problem.
#[derive(Debug, Default)]
pub struct RecordingCacheStore {
    inner: InMemoryCacheStore,
    get_calls: Mutex<Vec<CacheKey>>,
    range_calls: Mutex<Vec<CacheKey>>,
    failing: Mutex<HashSet<CacheKey>>,
    fail_all: AtomicBool,
}

impl RecordingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value in the wrapped cache.
    pub fn put(&self, key: &CacheKey, value: impl Into<Vec<u8>>) {
        self.inner
            .put(key, value)
            .expect("in-memory put should succeed");
    }

    /// Add a member to a log index in the wrapped cache.
    pub fn add_log(&self, key: &CacheKey, score: i64, member: &str) {
        self.inner
            .add_log(key, score, member)
            .expect("in-memory add_log should succeed");
    }

    /// Make every call touching `key` fail with an I/O error.
    pub fn fail_key(&self, key: &CacheKey) {
        lock(&self.failing).insert(key.clone());
    }

    /// Make every call fail with an I/O error.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Keys passed to `get`, in call order.
    pub fn get_calls(&self) -> Vec<CacheKey> {
        lock(&self.get_calls).clone()
    }

    /// Number of `get` calls for a specific key.
    pub fn get_count(&self, key: &CacheKey) -> usize {
        lock(&self.get_calls).iter().filter(|k| *k == key).count()
    }

    /// Keys passed to `rev_range`, in call order.
    pub fn range_calls(&self) -> Vec<CacheKey> {
        lock(&self.range_calls).clone()
    }

    fn check(&self, key: &CacheKey) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) || lock(&self.failing).contains(key) {
            return Err(StoreError::io("recording-cache", "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RecordingCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError> {
        lock(&self.get_calls).push(key.clone());
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn rev_range(
        &self,
        key: &CacheKey,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError> {
        lock(&self.range_calls).push(key.clone());
        self.check(key)?;
        self.inner.rev_range(key, start, stop).await
    }
}

/// Durable store that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingDurableStore {
    inner: InMemoryDurableStore,
    calls: Mutex<Vec<ObjectPath>>,
    failing: Mutex<HashSet<ObjectPath>>,
    fail_all: AtomicBool,
}

impl RecordingDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object in the wrapped store.
    pub fn put(&self, path: &ObjectPath, bytes: impl Into<Vec<u8>>) {
        self.inner
            .put(path, bytes)
            .expect("in-memory put should succeed");
    }

    /// Make reads of `path` fail with an I/O error.
    pub fn fail_path(&self, path: &ObjectPath) {
        lock(&self.failing).insert(path.clone());
    }

    /// Make every read fail with an I/O error.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Paths read, in call order.
    pub fn calls(&self) -> Vec<ObjectPath> {
        lock(&self.calls).clone()
    }

    /// Number of reads of a specific path.
    pub fn call_count(&self, path: &ObjectPath) -> usize {
        lock(&self.calls).iter().filter(|p| *p == path).count()
    }
}

#[async_trait]
impl DurableStore for RecordingDurableStore {
    async fn get(&self, path: &ObjectPath) -> Result<Vec<u8>, StoreError> {
        lock(&self.calls).push(path.clone());
        if self.fail_all.load(Ordering::SeqCst) || lock(&self.failing).contains(path) {
            return Err(StoreError::io("recording-durable", "injected failure"));
        }
        self.inner.get(path).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for buildview types.

    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    /// Generate a valid `owner/name` repository identifier.
    pub fn arb_repo_id() -> impl Strategy<Value = RepoId> {
        ("[a-z][a-z0-9-]{0,11}", "[a-z][a-z0-9_.-]{0,11}")
            .prop_filter_map("valid repository id", |(owner, name)| {
                RepoId::parse(format!("{}/{}", owner, name)).ok()
            })
    }

    /// Generate a valid branch name, optionally with a `/` prefix segment.
    pub fn arb_branch_name() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z][a-z0-9_-]{0,11}",
            "(feature|fix|release)/[a-z0-9][a-z0-9._-]{0,9}",
        ]
        .prop_filter("valid branch name", |name| BranchName::parse(name.clone()).is_ok())
    }

    /// Generate build timestamps in seconds.
    ///
    /// Half of the values come from a narrow window so that databases with
    /// equal build dates are common.
    pub fn arb_build_seconds() -> impl Strategy<Value = i64> {
        prop_oneof![1000i64..1004, 1577836800i64..1893456000i64]
    }

    /// Generate a BuildDate.
    pub fn arb_build_date() -> impl Strategy<Value = BuildDate> {
        arb_build_seconds().prop_filter_map("in range", BuildDate::from_unix_seconds)
    }

    /// Generate extra, non-date fields of a branch record.
    pub fn arb_extra_fields() -> impl Strategy<Value = Vec<(String, Value)>> {
        prop::collection::vec(
            (
                "(commit|author|status|tags)",
                prop_oneof![
                    "[a-f0-9]{7,12}".prop_map(Value::from),
                    any::<i32>().prop_map(Value::from),
                    any::<bool>().prop_map(Value::from),
                    Just(Value::Null),
                    prop::collection::vec("[a-z]{1,5}", 0..3).prop_map(Value::from),
                ],
            ),
            0..4,
        )
    }

    /// Generate the JSON bytes of a valid build database.
    ///
    /// Build dates are written either as Unix seconds or RFC 3339 strings.
    pub fn arb_build_database_json() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::btree_map(
            arb_branch_name(),
            (arb_build_date(), any::<bool>(), arb_extra_fields()),
            0..12,
        )
        .prop_map(|branches| {
            let mut root = Map::new();
            for (branch, (date, as_string, extras)) in branches {
                let mut record = Map::new();
                for (name, value) in extras {
                    record.insert(name, value);
                }
                let date = if as_string {
                    json!(date.to_string())
                } else {
                    json!(date.unix_seconds())
                };
                record.insert("buildDate".to_string(), date);
                root.insert(branch, Value::Object(record));
            }
            Value::Object(root).to_string().into_bytes()
        })
    }

    /// Generate a decoded build database.
    pub fn arb_build_database() -> impl Strategy<Value = BuildDatabase> {
        arb_build_database_json()
            .prop_filter_map("decodes", |bytes| BuildDatabase::decode(&bytes).ok())
    }

    /// Generate recent log entries as `(score, member)` pairs with unique members.
    pub fn arb_log_entries() -> impl Strategy<Value = Vec<(i64, String)>> {
        prop::collection::btree_map("log-[a-z0-9]{4,8}", 0i64..1_000_000, 0..30)
            .prop_map(|entries| entries.into_iter().map(|(m, s)| (s, m)).collect())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores for common resolution scenarios.

    use super::*;
    use std::sync::Arc;

    /// Repository used by the standard scenarios.
    pub const SCENARIO_REPO: &str = "acme/tool";

    /// Repository that has never been built.
    pub const UNKNOWN_REPO: &str = "ghost/repo";

    /// Two-branch database: `master` built at 1000, `dev` at 2000.
    pub const SCENARIO_DATABASE: &[u8] =
        br#"{"master":{"buildDate":1000},"dev":{"buildDate":2000}}"#;

    /// Parse a repository identifier that is known to be valid.
    pub fn repo(name: &str) -> RepoId {
        RepoId::parse(name).expect("fixture repository id should be valid")
    }

    /// Parse a branch name that is known to be valid.
    pub fn branch(name: &str) -> BranchName {
        BranchName::parse(name).expect("fixture branch name should be valid")
    }

    /// A cache and a durable store wired up for one test.
    #[derive(Debug, Clone, Default)]
    pub struct StoreFixture {
        pub cache: Arc<RecordingCacheStore>,
        pub durable: Arc<RecordingDurableStore>,
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_status(self, repo: &RepoId, status: &str) -> Self {
            self.cache.put(&CacheKey::build_status(repo), status);
            self
        }

        pub fn with_duration(self, repo: &RepoId, duration: &str) -> Self {
            self.cache.put(&CacheKey::build_duration(repo), duration);
            self
        }

        pub fn with_signature(self, repo: &RepoId, branch: &BranchName, signature: &str) -> Self {
            self.cache.put(&CacheKey::signature(repo, branch), signature);
            self
        }

        pub fn with_logs(self, repo: &RepoId, entries: &[(i64, &str)]) -> Self {
            let key = CacheKey::logs(repo);
            for (score, member) in entries {
                self.cache.add_log(&key, *score, member);
            }
            self
        }

        pub fn with_cached_database(self, repo: &RepoId, bytes: &[u8]) -> Self {
            self.cache.put(&CacheKey::build_database(repo), bytes);
            self
        }

        pub fn with_durable_database(self, repo: &RepoId, bytes: &[u8]) -> Self {
            self.durable.put(&ObjectPath::build_database(repo), bytes);
            self
        }

        pub fn with_readme(self, repo: &RepoId, branch: &BranchName, text: &str) -> Self {
            self.durable.put(&ObjectPath::readme(repo, branch), text);
            self
        }
    }

    /// `acme/tool` with status, duration and the two-branch database cached.
    pub fn scenario_cached() -> StoreFixture {
        let repo = repo(SCENARIO_REPO);
        StoreFixture::new()
            .with_status(&repo, "success")
            .with_duration(&repo, "42")
            .with_cached_database(&repo, SCENARIO_DATABASE)
    }

    /// `ghost/repo`: nothing in either store.
    pub fn scenario_unknown() -> StoreFixture {
        StoreFixture::new()
    }

    /// `acme/tool` with status cached but the database only in the durable store.
    pub fn scenario_durable_only() -> StoreFixture {
        let repo = repo(SCENARIO_REPO);
        StoreFixture::new()
            .with_status(&repo, "success")
            .with_durable_database(&repo, SCENARIO_DATABASE)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for history ordering and store errors.

    use super::*;
    use std::cmp::Ordering;

    /// Assert that history is in display order with no equal neighbours.
    #[track_caller]
    pub fn assert_history_sorted(history: &[BranchHistoryEntry]) {
        for pair in history.windows(2) {
            assert_eq!(
                history_order(&pair[0], &pair[1]),
                Ordering::Less,
                "History out of order: {:?} before {:?}",
                pair[0],
                pair[1]
            );
            assert!(
                pair[0].build_date >= pair[1].build_date,
                "Build dates not descending: {:?} before {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Assert that history matches `(branch, unix seconds)` pairs exactly.
    #[track_caller]
    pub fn assert_history_matches(history: &[BranchHistoryEntry], expected: &[(&str, i64)]) {
        let actual: Vec<(&str, i64)> = history
            .iter()
            .map(|entry| (entry.branch_name.as_str(), entry.build_date.unix_seconds()))
            .collect();
        assert_eq!(actual, expected, "History mismatch");
    }

    /// Assert that a store result is a clean absence.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, StoreError>) {
        match result {
            Err(StoreError::NotFound { .. }) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    /// Assert that a store result is an I/O failure.
    #[track_caller]
    pub fn assert_io_error<T: std::fmt::Debug>(result: &Result<T, StoreError>) {
        match result {
            Err(StoreError::Io { .. }) => {}
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scenario_database_fixture_decodes() {
        let db = BuildDatabase::decode(fixtures::SCENARIO_DATABASE).expect("valid fixture");
        assertions::assert_history_matches(&branch_history(&db), &[("dev", 2000), ("master", 1000)]);
    }

    #[tokio::test]
    async fn test_recording_cache_counts_and_fails() {
        let store = RecordingCacheStore::new();
        let repo = fixtures::repo(fixtures::SCENARIO_REPO);
        let key = CacheKey::build_status(&repo);

        store.put(&key, "success");
        assert_eq!(
            store.get(&key).await.expect("get"),
            Some(b"success".to_vec())
        );

        store.fail_key(&key);
        assertions::assert_io_error(&store.get(&key).await);
        assert_eq!(store.get_count(&key), 2);
        assert_eq!(store.get_count(&CacheKey::logs(&repo)), 0);
    }

    #[tokio::test]
    async fn test_recording_durable_counts_and_fails() {
        let store = RecordingDurableStore::new();
        let repo = fixtures::repo(fixtures::SCENARIO_REPO);
        let path = ObjectPath::build_database(&repo);

        assertions::assert_not_found(&store.get(&path).await);
        store.put(&path, fixtures::SCENARIO_DATABASE);
        assert!(store.get(&path).await.is_ok());

        store.fail_all();
        assertions::assert_io_error(&store.get(&path).await);
        assert_eq!(store.call_count(&path), 3);
    }

    #[tokio::test]
    async fn test_scenario_fixtures() {
        let repo = fixtures::repo(fixtures::SCENARIO_REPO);

        let cached = fixtures::scenario_cached();
        assert!(cached
            .cache
            .get(&CacheKey::build_database(&repo))
            .await
            .expect("get")
            .is_some());

        let durable_only = fixtures::scenario_durable_only();
        assert!(durable_only
            .cache
            .get(&CacheKey::build_database(&repo))
            .await
            .expect("get")
            .is_none());
        assert!(durable_only
            .durable
            .get(&ObjectPath::build_database(&repo))
            .await
            .is_ok());
    }

    proptest! {
        #[test]
        fn prop_generated_repo_ids_are_valid(repo in generators::arb_repo_id()) {
            prop_assert!(RepoId::parse(repo.as_str()).is_ok());
        }

        #[test]
        fn prop_generated_databases_decode(bytes in generators::arb_build_database_json()) {
            prop_assert!(BuildDatabase::decode(&bytes).is_ok());
        }

        #[test]
        fn prop_generated_database_history_covers_every_branch(
            db in generators::arb_build_database()
        ) {
            let history = branch_history(&db);
            assertions::assert_history_sorted(&history);
            prop_assert_eq!(history.len(), db.len());
            for entry in &history {
                prop_assert!(db.contains_branch(entry.branch_name.as_str()));
            }
        }
    }
}
