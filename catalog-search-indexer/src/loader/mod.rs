//! Loader module for the search indexer ingest.
//!
//! Applies processed messages to the search index with the version guard,
//! retrying transient failures and collecting the messages that must be
//! dead-lettered.

mod retry;

pub use retry::RetryPolicy;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use catalog_search_repository::{ApplyOutcome, SearchIndexError, SearchIndexProvider};
use catalog_search_shared::ProductId;
use futures::stream::{self, StreamExt};
use tokio_retry::RetryIf;
use tracing::{debug, instrument, warn};

use crate::dead_letter::DeadLetterRecord;
use crate::processor::{IndexAction, ProcessedMessage};

/// Default number of product groups applied concurrently.
const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration for the search loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Retry policy for each event.
    pub retry: RetryPolicy,
    /// Maximum number of distinct products applied at the same time.
    pub concurrency: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Result of loading one batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub applied: u64,
    pub stale: u64,
    pub absent: u64,
    /// Messages to publish to the dead-letter topic, in offset order.
    pub dead_letters: Vec<DeadLetterRecord>,
}

impl LoadReport {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Stale => self.stale += 1,
            ApplyOutcome::Absent => self.absent += 1,
        }
    }

    fn merge(&mut self, other: LoadReport) {
        self.applied += other.applied;
        self.stale += other.stale;
        self.absent += other.absent;
        self.dead_letters.extend(other.dead_letters);
    }
}

/// Loader that applies index actions to the search store.
///
/// Messages for the same product are applied one after the other in delivery
/// order. Different products are applied concurrently, bounded by
/// [`LoaderConfig::concurrency`].
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        Self { provider, config }
    }

    /// Check that the store answers before consuming.
    pub async fn check_ready(&self) -> Result<(), SearchIndexError> {
        self.provider.ping().await
    }

    /// Apply a batch of processed messages.
    ///
    /// Never fails as a whole: every message ends up either applied (including
    /// stale and absent no-ops) or in [`LoadReport::dead_letters`].
    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    pub async fn load(&self, messages: Vec<ProcessedMessage>) -> LoadReport {
        let mut report = LoadReport::default();
        let groups = group_by_product(messages, &mut report);

        let group_reports: Vec<LoadReport> = stream::iter(groups)
            .map(|group| self.apply_group(group))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for group_report in group_reports {
            report.merge(group_report);
        }
        report.dead_letters.sort_by(|a, b| {
            let (a, b) = (&a.message.source, &b.message.source);
            (&a.topic, a.partition, a.offset).cmp(&(&b.topic, b.partition, b.offset))
        });

        debug!(
            applied = report.applied,
            stale = report.stale,
            absent = report.absent,
            dead_lettered = report.dead_letters.len(),
            "Batch loaded"
        );
        report
    }

    /// Apply the messages of one product sequentially.
    async fn apply_group(&self, group: Vec<ProcessedMessage>) -> LoadReport {
        let mut report = LoadReport::default();
        for processed in group {
            match self.apply_with_retry(&processed).await {
                Ok(outcome) => {
                    debug!(
                        product_id = ?processed.product_id(),
                        version = processed.version(),
                        outcome = outcome.as_str(),
                        "Event applied"
                    );
                    report.record(outcome);
                }
                Err((e, attempts)) => {
                    report.dead_letters.push(DeadLetterRecord::apply_failed(
                        processed.message,
                        e.to_string(),
                        attempts,
                    ));
                }
            }
        }
        report
    }

    /// Apply one action, retrying retriable errors with exponential backoff.
    ///
    /// Returns the last error and the number of attempts made on failure.
    async fn apply_with_retry(
        &self,
        processed: &ProcessedMessage,
    ) -> Result<ApplyOutcome, (SearchIndexError, u32)> {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let action = &processed.action;

        let result = RetryIf::spawn(
            self.config.retry.strategy(),
            move || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.apply_once(action)
            },
            move |e: &SearchIndexError| {
                let retriable = e.is_retriable();
                warn!(
                    product_id = ?processed.product_id(),
                    attempt = attempts.load(Ordering::Relaxed),
                    max_attempts = self.config.retry.max_attempts,
                    retriable,
                    error = %e,
                    "Apply failed"
                );
                retriable
            },
        )
        .await;

        result.map_err(|e| (e, attempts.load(Ordering::Relaxed)))
    }

    async fn apply_once(&self, action: &IndexAction) -> Result<ApplyOutcome, SearchIndexError> {
        match action {
            IndexAction::Upsert(doc) => self.provider.upsert_product(doc).await,
            IndexAction::Delete(request) => self.provider.delete_product(request).await,
            IndexAction::Malformed(reason) => Err(SearchIndexError::validation(reason.clone())),
        }
    }
}

/// Split a batch into per-product groups, keeping delivery order inside each
/// group. Malformed messages go straight to the report's dead letters.
fn group_by_product(
    messages: Vec<ProcessedMessage>,
    report: &mut LoadReport,
) -> Vec<Vec<ProcessedMessage>> {
    let mut groups: Vec<Vec<ProcessedMessage>> = Vec::new();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();

    for processed in messages {
        let Some(product_id) = processed.product_id() else {
            let reason = match &processed.action {
                IndexAction::Malformed(reason) => reason.clone(),
                _ => String::new(),
            };
            report
                .dead_letters
                .push(DeadLetterRecord::malformed(processed.message, reason));
            continue;
        };

        let index = *positions.entry(product_id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(processed);
    }

    groups
}
