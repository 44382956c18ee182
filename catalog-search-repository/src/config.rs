//! Configuration types for the search store and the query service.
//!
//! Settings are read through a lookup function so they can be built from the
//! process environment in production and from a plain map in tests.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use catalog_search_shared::config::{parsed_var, required_var};
pub use catalog_search_shared::ConfigError;

use url::Url;

use crate::opensearch::ConnectionMode;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default cap on the number of search results.
const DEFAULT_MAX_RESULTS: usize = 100;

/// Which document store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// OpenSearch cluster.
    OpenSearch,
    /// Process-local store, for local runs without infrastructure.
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opensearch" => Ok(Self::OpenSearch),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown store '{}'", other)),
        }
    }
}

/// Connection settings for the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Store implementation.
    pub kind: StoreKind,
    /// OpenSearch server URL. Empty for the in-memory store.
    pub url: String,
    /// Index alias used for every document operation (the collection name).
    pub index_alias: String,
    /// Version suffix of the physical index behind the alias.
    pub index_version: u32,
    /// Behavior when the store cannot be reached at startup.
    pub connection_mode: ConnectionMode,
    /// Delay between connection attempts in retry mode.
    pub retry_interval: Duration,
}

impl StoreSettings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_STORE`: "opensearch" (default) or "memory"
    /// - `OPENSEARCH_URL`: OpenSearch server URL (required for opensearch)
    /// - `SEARCH_INDEX_ALIAS`: Index alias name (required)
    /// - `SEARCH_INDEX_VERSION`: Index version number (default: 0)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = parsed_var(&lookup, "SEARCH_STORE", StoreKind::OpenSearch)?;
        let url = match kind {
            StoreKind::OpenSearch => {
                let url = required_var(&lookup, "OPENSEARCH_URL")?;
                Url::parse(&url).map_err(|e| ConfigError::Invalid {
                    name: "OPENSEARCH_URL".to_string(),
                    value: url.clone(),
                    reason: e.to_string(),
                })?;
                url
            }
            StoreKind::Memory => String::new(),
        };
        let index_alias = required_var(&lookup, "SEARCH_INDEX_ALIAS")?;
        let index_version = parsed_var(&lookup, "SEARCH_INDEX_VERSION", 0u32)?;
        let connection_mode =
            parsed_var(&lookup, "OPENSEARCH_CONNECTION_MODE", ConnectionMode::Retry)?;
        let retry_interval_secs = parsed_var(
            &lookup,
            "OPENSEARCH_RETRY_INTERVAL_SECS",
            DEFAULT_RETRY_INTERVAL_SECS,
        )?;

        Ok(Self {
            kind,
            url,
            index_alias,
            index_version,
            connection_mode,
            retry_interval: Duration::from_secs(retry_interval_secs),
        })
    }
}

/// Configuration for the `ProductSearchService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSearchServiceConfig {
    /// Upper bound on the number of records a single search returns.
    pub max_results: usize,
}

impl Default for ProductSearchServiceConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ProductSearchServiceConfig {
    /// Read `SEARCH_MAX_RESULTS` through `lookup` (default: 100).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_results = parsed_var(&lookup, "SEARCH_MAX_RESULTS", DEFAULT_MAX_RESULTS)?;
        if max_results == 0 {
            return Err(ConfigError::Invalid {
                name: "SEARCH_MAX_RESULTS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self { max_results })
    }
}
