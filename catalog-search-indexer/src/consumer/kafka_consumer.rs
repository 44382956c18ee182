//! Kafka consumer implementation for the search indexer.
//!
//! Consumes product events from the events topic and forwards them to the
//! orchestrator in batches. Offsets are committed only when the orchestrator
//! acknowledges a batch.

use async_trait::async_trait;
use catalog_kafka::KafkaSettings;
use rdkafka::{
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::messages::{highest_offsets, InboundMessage, SourceOffset, StreamMessage};
use crate::errors::IngestError;
use crate::orchestrator::Consumer;

/// Default batch size for Kafka message batching.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default batch timeout in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// How messages are grouped before they are handed to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of messages to batch before sending.
    pub size: usize,
    /// Maximum time to wait before flushing a partial batch.
    pub timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_millis(DEFAULT_BATCH_TIMEOUT_MS),
        }
    }
}

/// Kafka consumer for product events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
    batch: BatchConfig,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer in consumer group `group_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(
        settings: &KafkaSettings,
        group_id: &str,
        topic: &str,
        batch: BatchConfig,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = settings
            .consumer_config(group_id)
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            broker = %settings.broker,
            group_id = %group_id,
            topic = %topic,
            batch_size = batch.size,
            batch_timeout_ms = batch.timeout.as_millis() as u64,
            "Created Kafka consumer with batching"
        );

        Ok(Self {
            consumer,
            topics: vec![topic.to_string()],
            batch,
        })
    }

    /// Send the pending batch to the orchestrator.
    ///
    /// Returns `false` when the batch could not be handed off, either because
    /// shutdown was requested while waiting for channel capacity or because the
    /// orchestrator stopped receiving. The batch is then left uncommitted.
    async fn flush_batch(
        &self,
        batch: &mut Vec<InboundMessage>,
        sender: &mpsc::Sender<StreamMessage>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> bool {
        if batch.is_empty() {
            return true;
        }

        let messages: Vec<InboundMessage> = std::mem::take(batch);
        let offsets: Vec<SourceOffset> = messages.iter().map(|m| m.source.clone()).collect();
        let message_count = messages.len();

        debug!(message_count, "Sending batch to orchestrator");
        tokio::select! {
            sent = sender.send(StreamMessage::Events { messages, offsets }) => match sent {
                Ok(()) => true,
                Err(_) => {
                    warn!(message_count, "Orchestrator stopped receiving batches");
                    false
                }
            },
            _ = shutdown.recv() => {
                info!(message_count, "Shutdown requested while handing off a batch");
                false
            }
        }
    }

    /// Commit the offsets of an acknowledged batch.
    fn commit_offsets(&self, offsets: &[SourceOffset]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for source in highest_offsets(offsets) {
            let next = Offset::Offset(source.offset + 1);
            tpl.add_partition_offset(&source.topic, source.partition, next)
                .map_err(|e| IngestError::kafka(e.to_string()))?;
        }

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))
    }
}

/// Copy a borrowed Kafka message into an owned inbound message.
///
/// A message without payload is kept with an empty payload; it fails decoding
/// and is dead-lettered like any other malformed message.
fn to_inbound(msg: &BorrowedMessage<'_>) -> InboundMessage {
    InboundMessage::new(
        SourceOffset::new(msg.topic(), msg.partition(), msg.offset()),
        msg.key().map(<[u8]>::to_vec),
        msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
    )
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// Consume messages and send them to the orchestrator in batches.
    ///
    /// Acknowledged batches are committed; a negative acknowledgment leaves the
    /// offsets uncommitted so the messages are redelivered after restart.
    ///
    /// Shutdown stops reading from Kafka only. Acknowledgments are still
    /// committed until the orchestrator closes the acknowledgment channel, so a
    /// batch finished during the grace period is not redelivered.
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut batch: Vec<InboundMessage> = Vec::with_capacity(self.batch.size);
        let mut flush_timer = tokio::time::interval(self.batch.timeout);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        flush_timer.tick().await;

        let mut reading = true;

        loop {
            tokio::select! {
                // Acknowledgments first, so a batch acked right before shutdown is still committed
                biased;

                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success: true, .. }) => {
                            match self.commit_offsets(&offsets) {
                                Ok(()) => debug!(offset_count = offsets.len(), "Committed offsets after successful processing"),
                                Err(e) => error!(error = %e, "Failed to commit offsets after acknowledgment"),
                            }
                        }
                        Some(StreamMessage::Acknowledgment { offsets, success: false, error }) => {
                            error!(
                                offset_count = offsets.len(),
                                error = error.as_deref().unwrap_or("Unknown error"),
                                "Not committing offsets due to processing failure"
                            );
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        Some(_) => {
                            warn!("Unexpected message on acknowledgment channel");
                        }
                    }
                }
                _ = shutdown.recv(), if reading => {
                    // Pending messages are not committed and will be re-read on restart
                    info!(pending = batch.len(), "Consumer received shutdown signal, stopped reading");
                    batch.clear();
                    reading = false;
                }
                message = message_stream.next(), if reading => {
                    match message {
                        Some(Ok(msg)) => {
                            debug!(
                                topic = %msg.topic(),
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "Received message from Kafka"
                            );
                            batch.push(to_inbound(&msg));

                            if batch.len() >= self.batch.size {
                                reading = self.flush_batch(&mut batch, &sender, &mut shutdown).await;
                            }
                        }
                        Some(Err(e)) => {
                            // librdkafka reconnects on its own; surface the error and keep going
                            warn!(error = %e, "Kafka error");
                            let _ = sender.try_send(StreamMessage::Error(e.to_string()));
                        }
                        None => {
                            info!("Kafka stream ended");
                            if self.flush_batch(&mut batch, &sender, &mut shutdown).await {
                                let _ = sender.send(StreamMessage::End).await;
                            }
                            reading = false;
                        }
                    }
                }
                _ = flush_timer.tick(), if reading => {
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "Flushing batch due to timeout");
                        reading = self.flush_batch(&mut batch, &sender, &mut shutdown).await;
                    }
                }
            }
        }

        Ok(())
    }
}
