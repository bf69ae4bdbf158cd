use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing enrichment activity.
#[derive(Default)]
pub struct TopologyMetrics {
    chunks_analyzed: AtomicU64,
    chunks_skipped: AtomicU64,
    tags_detected: AtomicU64,
    connectors_detected: AtomicU64,
    invalid_geometries: AtomicU64,
}

impl TopologyMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chunk that produced a topology report.
    pub fn record_analyzed(&self, tags: u64, connectors: u64, invalid_geometries: u64) {
        self.chunks_analyzed.fetch_add(1, Ordering::Relaxed);
        self.tags_detected.fetch_add(tags, Ordering::Relaxed);
        self.connectors_detected
            .fetch_add(connectors, Ordering::Relaxed);
        self.invalid_geometries
            .fetch_add(invalid_geometries, Ordering::Relaxed);
    }

    /// Record a chunk that received the skipped sentinel.
    pub fn record_skipped(&self, invalid_geometries: u64) {
        self.chunks_skipped.fetch_add(1, Ordering::Relaxed);
        self.invalid_geometries
            .fetch_add(invalid_geometries, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_analyzed: self.chunks_analyzed.load(Ordering::Relaxed),
            chunks_skipped: self.chunks_skipped.load(Ordering::Relaxed),
            tags_detected: self.tags_detected.load(Ordering::Relaxed),
            connectors_detected: self.connectors_detected.load(Ordering::Relaxed),
            invalid_geometries: self.invalid_geometries.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of enrichment counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Chunks that produced a topology report since startup.
    pub chunks_analyzed: u64,
    /// Chunks that received the skipped sentinel.
    pub chunks_skipped: u64,
    /// Tags found across all analyzed chunks.
    pub tags_detected: u64,
    /// Connectors found across all analyzed chunks.
    pub connectors_detected: u64,
    /// Lines dropped because their polygon was malformed or degenerate.
    pub invalid_geometries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_analyzed_and_skipped_chunks() {
        let metrics = TopologyMetrics::new();
        metrics.record_analyzed(2, 1, 0);
        metrics.record_analyzed(3, 0, 1);
        metrics.record_skipped(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chunks_analyzed, 2);
        assert_eq!(snapshot.chunks_skipped, 1);
        assert_eq!(snapshot.tags_detected, 5);
        assert_eq!(snapshot.connectors_detected, 1);
        assert_eq!(snapshot.invalid_geometries, 5);
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = TopologyMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
