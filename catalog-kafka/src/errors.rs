//! Error types for Kafka setup and publishing.

use catalog_search_shared::ConfigError;
use thiserror::Error;

/// Errors raised while configuring Kafka clients, provisioning topics or
/// publishing events.
#[derive(Error, Debug)]
pub enum KafkaSetupError {
    /// Missing or invalid settings.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Client creation or broker request failed.
    #[error("Kafka error: {0}")]
    Kafka(String),

    /// A topic could not be created.
    #[error("Failed to create topic {topic}: {reason}")]
    TopicCreation { topic: String, reason: String },

    /// An event could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rdkafka::error::KafkaError> for KafkaSetupError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::Kafka(err.to_string())
    }
}
