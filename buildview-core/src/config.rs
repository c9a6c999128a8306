//! Configuration types
//!
//! Configuration is read from environment variables with defaults suitable
//! for local development. Values that are present but unparseable are
//! reported as [`ConfigError`] instead of silently falling back.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::identity::BranchName;

/// Default branch shown when a request names none.
pub const DEFAULT_BRANCH: &str = "master";

/// Number of log identifiers shown for a repository.
pub const DEFAULT_RECENT_LOG_LIMIT: usize = 11;

/// README text used when a branch has none.
pub const DEFAULT_README_FALLBACK: &str = "Project provided no README.md file.";

/// Largest accepted LMDB map size, in megabytes (1 TiB).
pub const MAX_LMDB_SIZE_MB: usize = 1024 * 1024;

// ============================================================================
// RESOLVER CONFIGURATION
// ============================================================================

/// Settings for repository view resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Branch used when a request does not select one.
    pub default_branch: BranchName,
    /// Maximum number of recent log identifiers to return.
    pub recent_log_limit: usize,
    /// README text returned when the durable store has none.
    pub readme_fallback: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_branch: BranchName::from_static(DEFAULT_BRANCH),
            recent_log_limit: DEFAULT_RECENT_LOG_LIMIT,
            readme_fallback: DEFAULT_README_FALLBACK.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create ResolverConfig from environment variables.
    ///
    /// Environment variables:
    /// - `BUILDVIEW_DEFAULT_BRANCH`: Branch used when none is requested (default: master)
    /// - `BUILDVIEW_RECENT_LOG_LIMIT`: Number of recent log ids (default: 11)
    /// - `BUILDVIEW_README_FALLBACK`: Text shown when a branch has no README
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create ResolverConfig from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("BUILDVIEW_DEFAULT_BRANCH") {
            config.default_branch =
                BranchName::parse(value.clone()).map_err(|e| ConfigError::InvalidValue {
                    field: "BUILDVIEW_DEFAULT_BRANCH".to_string(),
                    value,
                    reason: e.to_string(),
                })?;
        }
        if let Some(limit) = parse_var(&lookup, "BUILDVIEW_RECENT_LOG_LIMIT")? {
            config.recent_log_limit = limit;
        }
        if let Some(fallback) = lookup("BUILDVIEW_README_FALLBACK") {
            config.readme_fallback = fallback;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the default branch.
    pub fn with_default_branch(mut self, branch: BranchName) -> Self {
        self.default_branch = branch;
        self
    }

    /// Set the recent log limit.
    pub fn with_recent_log_limit(mut self, limit: usize) -> Self {
        self.recent_log_limit = limit;
        self
    }

    /// Set the README fallback text.
    pub fn with_readme_fallback(mut self, text: impl Into<String>) -> Self {
        self.readme_fallback = text.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_log_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recent_log_limit".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// STORAGE CONFIGURATION
// ============================================================================

/// Locations and limits of the two storage tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory of the LMDB cache environment.
    pub lmdb_path: PathBuf,
    /// LMDB map size in megabytes.
    pub lmdb_max_size_mb: usize,
    /// Root directory of the durable object store.
    pub durable_root: PathBuf,
    /// Upper bound for a single durable read.
    pub durable_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lmdb_path: PathBuf::from("./data/cache"),
            lmdb_max_size_mb: 256,
            durable_root: PathBuf::from("./data/objects"),
            durable_timeout: Duration::from_millis(5000),
        }
    }
}

impl StorageConfig {
    /// Create StorageConfig from environment variables.
    ///
    /// Environment variables:
    /// - `BUILDVIEW_LMDB_PATH`: LMDB directory (default: ./data/cache)
    /// - `BUILDVIEW_LMDB_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `BUILDVIEW_DURABLE_ROOT`: Durable object root (default: ./data/objects)
    /// - `BUILDVIEW_DURABLE_TIMEOUT_MS`: Durable read timeout (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create StorageConfig from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("BUILDVIEW_LMDB_PATH") {
            config.lmdb_path = PathBuf::from(path);
        }
        if let Some(size) = parse_var(&lookup, "BUILDVIEW_LMDB_MAX_SIZE_MB")? {
            config.lmdb_max_size_mb = size;
        }
        if let Some(root) = lookup("BUILDVIEW_DURABLE_ROOT") {
            config.durable_root = PathBuf::from(root);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "BUILDVIEW_DURABLE_TIMEOUT_MS")? {
            config.durable_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the LMDB directory.
    pub fn with_lmdb_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lmdb_path = path.into();
        self
    }

    /// Set the LMDB map size in megabytes.
    pub fn with_lmdb_max_size_mb(mut self, size_mb: usize) -> Self {
        self.lmdb_max_size_mb = size_mb;
        self
    }

    /// Set the durable store root.
    pub fn with_durable_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.durable_root = root.into();
        self
    }

    /// Set the durable read timeout.
    pub fn with_durable_timeout(mut self, timeout: Duration) -> Self {
        self.durable_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lmdb_max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lmdb_max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.lmdb_max_size_mb > MAX_LMDB_SIZE_MB {
            return Err(ConfigError::InvalidValue {
                field: "lmdb_max_size_mb".to_string(),
                value: self.lmdb_max_size_mb.to_string(),
                reason: format!("must be at most {MAX_LMDB_SIZE_MB}"),
            });
        }
        if self.durable_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "durable_timeout".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_resolver_config_defaults() {
        let config = ResolverConfig::from_lookup(lookup_from(&[])).expect("defaults are valid");
        assert_eq!(config.default_branch.as_str(), "master");
        assert_eq!(config.recent_log_limit, 11);
        assert_eq!(config.readme_fallback, DEFAULT_README_FALLBACK);
    }

    #[test]
    fn test_resolver_config_overrides() {
        let config = ResolverConfig::from_lookup(lookup_from(&[
            ("BUILDVIEW_DEFAULT_BRANCH", "main"),
            ("BUILDVIEW_RECENT_LOG_LIMIT", "5"),
            ("BUILDVIEW_README_FALLBACK", "none"),
        ]))
        .expect("valid overrides");
        assert_eq!(config.default_branch.as_str(), "main");
        assert_eq!(config.recent_log_limit, 5);
        assert_eq!(config.readme_fallback, "none");
    }

    #[test]
    fn test_resolver_config_rejects_bad_values() {
        let err = ResolverConfig::from_lookup(lookup_from(&[(
            "BUILDVIEW_RECENT_LOG_LIMIT",
            "many",
        )]))
        .expect_err("unparseable limit");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "BUILDVIEW_RECENT_LOG_LIMIT"));

        assert!(ResolverConfig::from_lookup(lookup_from(&[(
            "BUILDVIEW_RECENT_LOG_LIMIT",
            "0"
        )]))
        .is_err());
        assert!(ResolverConfig::from_lookup(lookup_from(&[(
            "BUILDVIEW_DEFAULT_BRANCH",
            "bad branch"
        )]))
        .is_err());
    }

    #[test]
    fn test_storage_config_from_lookup() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("BUILDVIEW_LMDB_PATH", "/var/cache/buildview"),
            ("BUILDVIEW_LMDB_MAX_SIZE_MB", "64"),
            ("BUILDVIEW_DURABLE_ROOT", "/srv/objects"),
            ("BUILDVIEW_DURABLE_TIMEOUT_MS", "250"),
        ]))
        .expect("valid config");
        assert_eq!(config.lmdb_path, PathBuf::from("/var/cache/buildview"));
        assert_eq!(config.lmdb_max_size_mb, 64);
        assert_eq!(config.durable_root, PathBuf::from("/srv/objects"));
        assert_eq!(config.durable_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_storage_config_rejects_zero_timeout() {
        assert!(StorageConfig::from_lookup(lookup_from(&[(
            "BUILDVIEW_DURABLE_TIMEOUT_MS",
            "0"
        )]))
        .is_err());
    }

    #[test]
    fn test_storage_config_rejects_oversized_map() {
        let result = StorageConfig::from_lookup(lookup_from(&[(
            "BUILDVIEW_LMDB_MAX_SIZE_MB",
            "18446744073709551615",
        )]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "lmdb_max_size_mb"
        ));

        let at_limit = StorageConfig::default().with_lmdb_max_size_mb(MAX_LMDB_SIZE_MB);
        assert!(at_limit.validate().is_ok());
        let over_limit = at_limit.with_lmdb_max_size_mb(MAX_LMDB_SIZE_MB + 1);
        assert!(over_limit.validate().is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = ResolverConfig::new()
            .with_recent_log_limit(3)
            .with_readme_fallback("n/a")
            .with_default_branch(BranchName::parse("trunk").expect("valid"));
        assert_eq!(config.recent_log_limit, 3);
        assert_eq!(config.readme_fallback, "n/a");
        assert_eq!(config.default_branch.as_str(), "trunk");

        let storage = StorageConfig::default()
            .with_lmdb_path("/tmp/c")
            .with_durable_root("/tmp/o")
            .with_lmdb_max_size_mb(32)
            .with_durable_timeout(Duration::from_secs(1));
        assert_eq!(storage.lmdb_max_size_mb, 32);
        assert_eq!(storage.lmdb_path, PathBuf::from("/tmp/c"));
        assert_eq!(storage.durable_root, PathBuf::from("/tmp/o"));
        assert_eq!(storage.durable_timeout, Duration::from_secs(1));
    }
}
