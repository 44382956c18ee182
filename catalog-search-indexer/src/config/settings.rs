//! Indexer settings read from the environment.

use std::env;
use std::time::Duration;

use catalog_kafka::{KafkaSettings, TopicSettings};
use catalog_search_repository::StoreSettings;
use catalog_search_shared::config::{parsed_var, required_var};
use catalog_search_shared::ConfigError;

use crate::consumer::BatchConfig;
use crate::loader::{LoaderConfig, RetryPolicy};
use crate::orchestrator::OrchestratorConfig;

/// Client id the indexer reports to Kafka.
const CLIENT_ID: &str = "catalog-search-indexer";

/// Everything the indexer needs to start.
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    pub kafka: KafkaSettings,
    pub topics: TopicSettings,
    /// Consumer group, i.e. the durable queue the indexer reads from.
    pub consumer_group: String,
    pub store: StoreSettings,
    pub batch: BatchConfig,
    pub loader: LoaderConfig,
    pub orchestrator: OrchestratorConfig,
}

impl IndexerSettings {
    /// Read and validate settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`, `KAFKA_CONSUMER_GROUP`: required
    /// - `KAFKA_TOPIC`, `KAFKA_DEAD_LETTER_TOPIC`, `KAFKA_TOPIC_PARTITIONS`: topics
    /// - `OPENSEARCH_URL`, `SEARCH_INDEX_ALIAS`: required for the OpenSearch store
    /// - `APPLY_MAX_ATTEMPTS` (5), `APPLY_INITIAL_BACKOFF_MS` (200), `APPLY_CONCURRENCY` (8)
    /// - `BATCH_SIZE` (50), `BATCH_TIMEOUT_MS` (1000)
    /// - `SHUTDOWN_GRACE_SECS` (10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read and validate settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kafka = KafkaSettings::from_lookup(&lookup, CLIENT_ID)?;
        let consumer_group = required_var(&lookup, "KAFKA_CONSUMER_GROUP")?;
        let topics = TopicSettings::from_lookup(&lookup)?;
        let store = StoreSettings::from_lookup(&lookup)?;

        let defaults = LoaderConfig::default();
        let max_attempts = parsed_var(&lookup, "APPLY_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        let initial_backoff_ms = parsed_var(
            &lookup,
            "APPLY_INITIAL_BACKOFF_MS",
            defaults.retry.initial_backoff.as_millis() as u64,
        )?;
        let concurrency = parsed_var(&lookup, "APPLY_CONCURRENCY", defaults.concurrency)?;

        let batch_defaults = BatchConfig::default();
        let batch_size = parsed_var(&lookup, "BATCH_SIZE", batch_defaults.size)?;
        let batch_timeout_ms = parsed_var(
            &lookup,
            "BATCH_TIMEOUT_MS",
            batch_defaults.timeout.as_millis() as u64,
        )?;

        let orchestrator_defaults = OrchestratorConfig::default();
        let shutdown_grace_secs = parsed_var(
            &lookup,
            "SHUTDOWN_GRACE_SECS",
            orchestrator_defaults.shutdown_grace.as_secs(),
        )?;

        for (name, value) in [
            ("APPLY_CONCURRENCY", concurrency),
            ("BATCH_SIZE", batch_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        Ok(Self {
            kafka,
            topics,
            consumer_group,
            store,
            batch: BatchConfig {
                size: batch_size,
                timeout: Duration::from_millis(batch_timeout_ms),
            },
            loader: LoaderConfig {
                retry: RetryPolicy::new(max_attempts, Duration::from_millis(initial_backoff_ms)),
                concurrency,
            },
            orchestrator: OrchestratorConfig {
                shutdown_grace: Duration::from_secs(shutdown_grace_secs),
                ..orchestrator_defaults
            },
        })
    }
}
