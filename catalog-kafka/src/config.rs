//! Kafka client and topic settings.

use std::env;

use catalog_search_shared::config::{optional_var, parsed_var, required_var};
use catalog_search_shared::ConfigError;
use rdkafka::config::ClientConfig;

/// Default topic carrying product events.
pub const DEFAULT_EVENTS_TOPIC: &str = "catalog.products";

/// Suffix appended to the events topic to name the dead-letter topic.
const DEAD_LETTER_SUFFIX: &str = ".dead-letter";

/// Default partition count for provisioned topics.
const DEFAULT_PARTITIONS: i32 = 3;

/// Default replication factor for provisioned topics.
const DEFAULT_REPLICATION: i32 = 1;

/// Connection settings shared by every Kafka client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    /// Kafka broker address (e.g., "localhost:9092")
    pub broker: String,
    /// Client ID reported to the broker
    pub client_id: String,
    /// SASL username (enables SASL/SSL if set)
    pub username: Option<String>,
    /// SASL password (required if username is set)
    pub password: Option<String>,
    /// Custom CA certificate in PEM format
    pub ssl_ca_pem: Option<String>,
}

impl KafkaSettings {
    /// Create settings for a plaintext broker.
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            username: None,
            password: None,
            ssl_ca_pem: None,
        }
    }

    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER` - Broker address (required)
    /// - `KAFKA_USERNAME` - SASL username (optional, requires `KAFKA_PASSWORD`)
    /// - `KAFKA_PASSWORD` - SASL password (optional, requires `KAFKA_USERNAME`)
    /// - `KAFKA_SSL_CA_PEM` - Custom CA cert in PEM format (optional)
    pub fn from_env(client_id: impl Into<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok(), client_id)
    }

    /// Read settings through `lookup`.
    pub fn from_lookup<F>(lookup: F, client_id: impl Into<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let broker = required_var(&lookup, "KAFKA_BROKER")?;
        let username = optional_var(&lookup, "KAFKA_USERNAME");
        let password = optional_var(&lookup, "KAFKA_PASSWORD");

        // Half a credential pair would silently downgrade to plaintext
        match (&username, &password) {
            (Some(_), None) => return Err(ConfigError::Missing("KAFKA_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::Missing("KAFKA_USERNAME".to_string())),
            _ => {}
        }

        Ok(Self {
            broker,
            client_id: client_id.into(),
            username,
            password,
            ssl_ca_pem: optional_var(&lookup, "KAFKA_SSL_CA_PEM"),
        })
    }

    /// Base client configuration: broker, client id, and SASL/SSL when
    /// credentials are present.
    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.broker)
            .set("client.id", &self.client_id);

        // SASL/SSL for managed Kafka, plaintext for local development
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);

            if let Some(ca_pem) = &self.ssl_ca_pem {
                client_config.set("ssl.ca.pem", ca_pem);
            }
        }

        client_config
    }

    /// Producer configuration with zstd compression and idempotent delivery.
    pub fn producer_config(&self) -> ClientConfig {
        let mut client_config = self.client_config();
        client_config
            .set("compression.type", "zstd")
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", "5000");
        client_config
    }

    /// Consumer configuration for `group_id` with manual offset commits.
    ///
    /// Offsets are committed only after a batch is applied, so auto commit is
    /// disabled and a new group starts from the earliest retained event.
    pub fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut client_config = self.client_config();
        client_config
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000");
        client_config
    }
}

/// Names and layout of the topics the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSettings {
    /// Topic carrying product events.
    pub events_topic: String,
    /// Topic receiving messages that could not be applied.
    pub dead_letter_topic: String,
    /// Partition count used when provisioning.
    pub partitions: i32,
    /// Replication factor used when provisioning.
    pub replication: i32,
}

impl TopicSettings {
    /// Read topic settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_TOPIC` - Events topic (default: catalog.products)
    /// - `KAFKA_DEAD_LETTER_TOPIC` - Dead-letter topic (default: `<topic>.dead-letter`)
    /// - `KAFKA_TOPIC_PARTITIONS` - Partitions for new topics (default: 3)
    /// - `KAFKA_TOPIC_REPLICATION` - Replication factor for new topics (default: 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read topic settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let events_topic = optional_var(&lookup, "KAFKA_TOPIC")
            .unwrap_or_else(|| DEFAULT_EVENTS_TOPIC.to_string());
        let dead_letter_topic = optional_var(&lookup, "KAFKA_DEAD_LETTER_TOPIC")
            .unwrap_or_else(|| format!("{}{}", events_topic, DEAD_LETTER_SUFFIX));
        let partitions = parsed_var(&lookup, "KAFKA_TOPIC_PARTITIONS", DEFAULT_PARTITIONS)?;
        let replication = parsed_var(&lookup, "KAFKA_TOPIC_REPLICATION", DEFAULT_REPLICATION)?;

        if partitions < 1 {
            return Err(ConfigError::Invalid {
                name: "KAFKA_TOPIC_PARTITIONS".to_string(),
                value: partitions.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            events_topic,
            dead_letter_topic,
            partitions,
            replication,
        })
    }
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            events_topic: DEFAULT_EVENTS_TOPIC.to_string(),
            dead_letter_topic: format!("{}{}", DEFAULT_EVENTS_TOPIC, DEAD_LETTER_SUFFIX),
            partitions: DEFAULT_PARTITIONS,
            replication: DEFAULT_REPLICATION,
        }
    }
}
