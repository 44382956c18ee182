//! Idempotent topic provisioning.

use std::time::Duration;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use tracing::info;

use crate::config::{KafkaSettings, TopicSettings};
use crate::errors::KafkaSetupError;

/// How long the broker may take to create the topics.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of provisioning one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicStatus {
    Created(String),
    AlreadyExists(String),
}

/// Create the events and dead-letter topics if they are missing.
///
/// "Topic already exists" counts as success, so every process may call this on
/// startup.
pub async fn ensure_topics(
    kafka: &KafkaSettings,
    topics: &TopicSettings,
) -> Result<Vec<TopicStatus>, KafkaSetupError> {
    let admin: AdminClient<DefaultClientContext> = kafka.client_config().create()?;

    let new_topics = new_topics(topics);
    let options = AdminOptions::new().operation_timeout(Some(OPERATION_TIMEOUT));
    let results = admin.create_topics(new_topics.iter(), &options).await?;

    let statuses = results
        .into_iter()
        .map(topic_status)
        .collect::<Result<Vec<_>, _>>()?;

    for status in &statuses {
        match status {
            TopicStatus::Created(topic) => info!(topic = %topic, "Created Kafka topic"),
            TopicStatus::AlreadyExists(topic) => info!(topic = %topic, "Kafka topic already exists"),
        }
    }

    Ok(statuses)
}

fn new_topics(topics: &TopicSettings) -> Vec<NewTopic<'_>> {
    [&topics.events_topic, &topics.dead_letter_topic]
        .into_iter()
        .map(|name| {
            NewTopic::new(
                name,
                topics.partitions,
                TopicReplication::Fixed(topics.replication),
            )
        })
        .collect()
}

fn topic_status(result: TopicResult) -> Result<TopicStatus, KafkaSetupError> {
    match result {
        Ok(topic) => Ok(TopicStatus::Created(topic)),
        Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => Ok(TopicStatus::AlreadyExists(topic)),
        Err((topic, code)) => Err(KafkaSetupError::TopicCreation {
            topic,
            reason: code.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisions_events_and_dead_letter_topics() {
        let settings = TopicSettings::default();
        let topics = new_topics(&settings);

        let names: Vec<_> = topics.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["catalog.products", "catalog.products.dead-letter"]);
        assert!(topics.iter().all(|t| t.num_partitions == 3));
    }

    #[test]
    fn test_already_exists_is_success() {
        let status = topic_status(Err((
            "catalog.products".to_string(),
            RDKafkaErrorCode::TopicAlreadyExists,
        )))
        .unwrap();
        assert_eq!(status, TopicStatus::AlreadyExists("catalog.products".to_string()));
    }

    #[test]
    fn test_other_errors_fail() {
        let result = topic_status(Err((
            "catalog.products".to_string(),
            RDKafkaErrorCode::TopicAuthorizationFailed,
        )));
        assert!(matches!(result, Err(KafkaSetupError::TopicCreation { topic, .. }) if topic == "catalog.products"));
    }
}
