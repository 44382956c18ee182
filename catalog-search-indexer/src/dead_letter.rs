//! Dead-letter sink for messages the indexer cannot apply.
//!
//! A dead-lettered message keeps its original key and payload. The failure
//! reason and the source coordinates travel as headers.

use async_trait::async_trait;
use catalog_kafka::FutureProducer;
use chrono::{DateTime, Utc};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::FutureRecord;
use std::time::Duration;
use tracing::{error, warn};

use crate::consumer::InboundMessage;
use crate::errors::IngestError;

/// How long a dead-letter send may wait for space in the producer queue.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a message was dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The payload could not be decoded.
    Malformed,
    /// Applying the event failed after all retries.
    ApplyFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::ApplyFailed => "apply-failed",
        }
    }
}

/// A message on its way to the dead-letter topic.
#[derive(Debug, Clone)]
pub struct DeadLetterRecord {
    pub message: InboundMessage,
    pub kind: FailureKind,
    pub reason: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetterRecord {
    /// Record for a payload that failed decoding.
    pub fn malformed(message: InboundMessage, reason: impl Into<String>) -> Self {
        Self {
            message,
            kind: FailureKind::Malformed,
            reason: reason.into(),
            attempts: 0,
            failed_at: Utc::now(),
        }
    }

    /// Record for an event whose apply failed `attempts` times.
    pub fn apply_failed(message: InboundMessage, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            message,
            kind: FailureKind::ApplyFailed,
            reason: reason.into(),
            attempts,
            failed_at: Utc::now(),
        }
    }

    /// Header name/value pairs describing the failure.
    pub fn header_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dead-letter-kind", self.kind.as_str().to_string()),
            ("dead-letter-reason", self.reason.clone()),
            ("dead-letter-attempts", self.attempts.to_string()),
            ("dead-letter-failed-at", self.failed_at.to_rfc3339()),
            ("source-topic", self.message.source.topic.clone()),
            ("source-partition", self.message.source.partition.to_string()),
            ("source-offset", self.message.source.offset.to_string()),
        ]
    }
}

/// Destination for messages that cannot be applied.
///
/// A successful `publish` means the record is durable and the source message
/// may be acknowledged.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, record: &DeadLetterRecord) -> Result<(), IngestError>;
}

/// Dead-letter sink publishing to a Kafka topic.
pub struct KafkaDeadLetterSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaDeadLetterSink {
    pub fn new(producer: FutureProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterSink {
    async fn publish(&self, record: &DeadLetterRecord) -> Result<(), IngestError> {
        let header_values = record.header_values();
        let headers = header_values
            .iter()
            .fold(OwnedHeaders::new(), |headers, (key, value)| {
                headers.insert(Header {
                    key: *key,
                    value: Some(value.as_str()),
                })
            });

        let mut kafka_record = FutureRecord::to(&self.topic)
            .payload(&record.message.payload)
            .headers(headers);
        if let Some(key) = &record.message.key {
            kafka_record = kafka_record.key(key);
        }

        match self.producer.send(kafka_record, QUEUE_TIMEOUT).await {
            Ok(_) => {
                warn!(
                    topic = %self.topic,
                    source_topic = %record.message.source.topic,
                    partition = record.message.source.partition,
                    offset = record.message.source.offset,
                    kind = record.kind.as_str(),
                    reason = %record.reason,
                    "Message dead-lettered"
                );
                Ok(())
            }
            Err((e, _)) => {
                error!(
                    topic = %self.topic,
                    offset = record.message.source.offset,
                    error = %e,
                    "Failed to publish to dead-letter topic"
                );
                Err(IngestError::dead_letter(e.to_string()))
            }
        }
    }
}
