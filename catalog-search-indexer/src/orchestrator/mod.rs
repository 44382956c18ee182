//! Orchestrator module for the search indexer ingest.
//!
//! Coordinates the consumer, processor, loader and dead-letter sink.

mod stats;

pub use stats::{IndexerStats, ProgressLog, StatsSnapshot};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{InboundMessage, StreamMessage};
use crate::dead_letter::DeadLetterSink;
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::EventProcessor;

/// Default time the in-flight batch gets to finish after a shutdown request.
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Source of message batches.
///
/// `run` sends [`StreamMessage::Events`] to `sender` and commits the offsets of
/// every positive [`StreamMessage::Acknowledgment`] received on `ack_receiver`.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the configured topics.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Consume until the stream ends or `shutdown` fires.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// How long the in-flight batch may keep running after shutdown is requested.
    pub shutdown_grace: Duration,
    /// Interval between progress log lines.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 16,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// How a batch ended.
enum BatchStatus {
    /// Applied; keep consuming.
    Completed,
    /// Applied while shutdown was pending; stop after acknowledging.
    CompletedDuringShutdown,
    /// The grace period ran out; leave the batch unacknowledged and stop.
    Abandoned,
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Routes batches from the consumer through the processor and loader
/// - Dead-letters messages that cannot be applied
/// - Acknowledges a batch only after every message in it is applied or dead-lettered
/// - Handles shutdown with a grace period for the in-flight batch
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: EventProcessor,
    loader: SearchLoader,
    dead_letters: Arc<dyn DeadLetterSink>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    stats: Arc<IndexerStats>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Arc<dyn Consumer>,
        processor: EventProcessor,
        loader: SearchLoader,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self::with_config(
            consumer,
            processor,
            loader,
            dead_letters,
            OrchestratorConfig::default(),
        )
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: EventProcessor,
        loader: SearchLoader,
        dead_letters: Arc<dyn DeadLetterSink>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);

        Self {
            consumer,
            processor,
            loader,
            dead_letters,
            config,
            shutdown_tx,
            stats: Arc::new(IndexerStats::default()),
        }
    }

    /// Counters since startup.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// A sender that triggers a graceful shutdown of a running orchestrator.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the orchestrator.
    ///
    /// Blocks until the consumer stream ends, a shutdown is requested (Ctrl-C,
    /// SIGTERM or [`Orchestrator::shutdown`]), or a batch cannot be
    /// acknowledged. The last case returns the error; the batch is left
    /// uncommitted and is redelivered on the next start.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), IngestError> {
        info!("Starting search indexer orchestrator");

        self.loader
            .check_ready()
            .await
            .map_err(|e| IngestError::loader(format!("Search store not ready: {}", e)))?;

        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let consumer = self.consumer.clone();
        let consumer_shutdown = self.shutdown_tx.subscribe();
        let consumer_handle = tokio::spawn(async move {
            consumer
                .run(event_transmitter, ack_receiver, consumer_shutdown)
                .await
        });
        let signal_handle = tokio::spawn(forward_signals(self.shutdown_tx.clone()));

        info!("Ready to process events from Kafka");

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        progress_timer.tick().await;
        let mut progress = ProgressLog::new();

        let result = loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { messages, offsets }) => {
                            debug!(
                                message_count = messages.len(),
                                offset_count = offsets.len(),
                                "Received batch from consumer"
                            );
                            match self.process_with_grace(messages, &mut shutdown_rx).await {
                                Ok(status) => {
                                    let acked = !matches!(status, BatchStatus::Abandoned);
                                    send_ack(&ack_transmitter, StreamMessage::Acknowledgment {
                                        offsets,
                                        success: acked,
                                        error: (!acked).then(|| "shutdown grace period elapsed".to_string()),
                                    }).await;
                                    if !matches!(status, BatchStatus::Completed) {
                                        break Ok(());
                                    }
                                }
                                Err(e) => {
                                    error!(error = %e, "Failed to process batch. Leaving offsets uncommitted");
                                    send_ack(&ack_transmitter, StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }).await;
                                    break Err(e);
                                }
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            warn!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break Ok(());
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break Ok(());
                }
                _ = progress_timer.tick() => {
                    progress.tick(self.stats.snapshot());
                }
            }
        };

        // Stop the consumer; anything not acknowledged is redelivered on restart.
        // Closing both channels unblocks a pending batch hand-off and lets the
        // consumer return once it has committed the last acknowledgment.
        let _ = self.shutdown_tx.send(());
        signal_handle.abort();
        drop(event_receiver);
        drop(ack_transmitter);

        let consumer_abort = consumer_handle.abort_handle();
        match timeout(self.config.shutdown_grace, consumer_handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!(error = %e, "Consumer error"),
            Ok(Err(e)) => error!(error = %e, "Consumer task failed"),
            Err(_) => {
                warn!(
                    grace_secs = self.config.shutdown_grace.as_secs(),
                    "Consumer did not stop within the grace period, aborting it"
                );
                consumer_abort.abort();
            }
        }

        let totals = self.stats.snapshot();
        info!(
            total_events_processed = totals.events,
            total_documents_applied = totals.applied,
            total_stale_skipped = totals.stale,
            total_absent_deletes = totals.absent,
            total_dead_lettered = totals.dead_lettered,
            "Orchestrator shutdown complete"
        );
        result
    }

    /// Process a batch, giving it the grace period if shutdown arrives meanwhile.
    async fn process_with_grace(
        &self,
        messages: Vec<InboundMessage>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<BatchStatus, IngestError> {
        let processing = self.process_batch(messages);
        tokio::pin!(processing);

        tokio::select! {
            result = &mut processing => result.map(|()| BatchStatus::Completed),
            _ = shutdown_rx.recv() => {
                let grace = self.config.shutdown_grace;
                info!(grace_secs = grace.as_secs(), "Shutdown requested, finishing in-flight batch");
                match timeout(grace, &mut processing).await {
                    Ok(result) => result.map(|()| BatchStatus::CompletedDuringShutdown),
                    Err(_) => {
                        warn!(
                            error = %IngestError::ShutdownTimeout(grace.as_secs()),
                            "Abandoning in-flight batch"
                        );
                        Ok(BatchStatus::Abandoned)
                    }
                }
            }
        }
    }

    /// Decode, apply and dead-letter one batch.
    ///
    /// Returns `Ok` only once every message is applied (or skipped as stale or
    /// absent) or durably dead-lettered; the caller acknowledges after that.
    async fn process_batch(&self, messages: Vec<InboundMessage>) -> Result<(), IngestError> {
        let message_count = messages.len();
        let processed = self.processor.process_batch(messages);
        let report = self.loader.load(processed).await;

        for record in &report.dead_letters {
            self.dead_letters.publish(record).await?;
        }

        self.stats.record_batch(message_count, &report);
        Ok(())
    }
}

/// Hand an acknowledgment to the consumer.
async fn send_ack(ack_transmitter: &mpsc::Sender<StreamMessage>, ack: StreamMessage) {
    if let Err(e) = ack_transmitter.send(ack).await {
        warn!(error = %e, "Consumer stopped before the acknowledgment; offsets stay uncommitted");
    }
}

/// Forward Ctrl-C and SIGTERM to the shutdown channel.
async fn forward_signals(shutdown_tx: broadcast::Sender<()>) {
    wait_for_signal().await;
    info!("Received termination signal");
    let _ = shutdown_tx.send(());
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
