//! Progress counters for the indexer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::info;

use crate::loader::LoadReport;

/// Counters updated as batches complete.
#[derive(Debug, Default)]
pub struct IndexerStats {
    events: AtomicU64,
    applied: AtomicU64,
    stale: AtomicU64,
    absent: AtomicU64,
    dead_lettered: AtomicU64,
}

/// Point-in-time copy of [`IndexerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub events: u64,
    pub applied: u64,
    pub stale: u64,
    pub absent: u64,
    pub dead_lettered: u64,
}

impl IndexerStats {
    pub fn record_batch(&self, message_count: usize, report: &LoadReport) {
        self.events.fetch_add(message_count as u64, Ordering::Relaxed);
        self.applied.fetch_add(report.applied, Ordering::Relaxed);
        self.stale.fetch_add(report.stale, Ordering::Relaxed);
        self.absent.fetch_add(report.absent, Ordering::Relaxed);
        self.dead_lettered
            .fetch_add(report.dead_letters.len() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events: self.events.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            absent: self.absent.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }
}

/// Logs totals and rates since the previous tick.
pub struct ProgressLog {
    previous: StatsSnapshot,
    previous_at: Instant,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self {
            previous: StatsSnapshot::default(),
            previous_at: Instant::now(),
        }
    }

    pub fn tick(&mut self, current: StatsSnapshot) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.previous_at).as_secs_f64();
        let rate = |current: u64, previous: u64| {
            if elapsed_secs > 0.0 {
                (current.saturating_sub(previous) as f64) / elapsed_secs
            } else {
                0.0
            }
        };

        info!(
            events_processed = current.events,
            documents_applied = current.applied,
            stale_skipped = current.stale,
            absent_deletes = current.absent,
            dead_lettered = current.dead_lettered,
            events_per_sec = format!("{:.2}", rate(current.events, self.previous.events)),
            documents_per_sec = format!("{:.2}", rate(current.applied, self.previous.applied)),
            "Processing progress"
        );

        self.previous = current;
        self.previous_at = now;
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{InboundMessage, SourceOffset};
    use crate::dead_letter::DeadLetterRecord;

    #[test]
    fn test_record_batch_accumulates() {
        let stats = IndexerStats::default();
        let report = LoadReport {
            applied: 3,
            stale: 1,
            absent: 1,
            dead_letters: vec![DeadLetterRecord::malformed(
                InboundMessage::new(SourceOffset::new("t", 0, 0), None, Vec::new()),
                "bad",
            )],
        };

        stats.record_batch(6, &report);
        stats.record_batch(6, &report);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                events: 12,
                applied: 6,
                stale: 2,
                absent: 2,
                dead_lettered: 2,
            }
        );
    }
}
