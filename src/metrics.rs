use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage counters, shared between the stage thread and observers
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Values taken from the stage input
    received: Arc<AtomicU64>,
    /// Values handed downstream (or into the buffer for the terminal stage)
    forwarded: Arc<AtomicU64>,
    /// Values rejected by the stage predicate
    dropped: Arc<AtomicU64>,
    /// Creation time for throughput calculation
    start_time: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            received: Arc::new(AtomicU64::new(0)),
            forwarded: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Received values per second since creation
    pub fn throughput_per_sec(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_received() as f64 / elapsed
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_received: self.total_received(),
            total_forwarded: self.total_forwarded(),
            total_dropped: self.total_dropped(),
            throughput_per_sec: self.throughput_per_sec(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of stage metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_received: u64,
    pub total_forwarded: u64,
    pub total_dropped: u64,
    pub throughput_per_sec: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {}, Forwarded: {}, Dropped: {}, Throughput: {:.2} values/s, Elapsed: {:.2}s",
            self.total_received,
            self.total_forwarded,
            self.total_dropped,
            self.throughput_per_sec,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Counters for the periodic flusher
#[derive(Debug, Clone, Default)]
pub struct FlusherMetrics {
    ticks: Arc<AtomicU64>,
    flushes: Arc<AtomicU64>,
    values_flushed: Arc<AtomicU64>,
}

impl FlusherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered, non-empty snapshot of `len` values
    pub fn record_flush(&self, len: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.values_flushed.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn total_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn total_flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn total_values_flushed(&self) -> u64 {
        self.values_flushed.load(Ordering::Relaxed)
    }

    pub fn format(&self) -> String {
        format!(
            "Ticks: {}, Flushes: {}, Values flushed: {}",
            self.total_ticks(),
            self.total_flushes(),
            self.total_values_flushed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_metrics() {
        let metrics = StageMetrics::new();
        for i in 0..100 {
            metrics.record_received();
            if i % 2 == 0 {
                metrics.record_forwarded();
            } else {
                metrics.record_dropped();
            }
        }
        assert_eq!(metrics.total_received(), 100);
        assert_eq!(metrics.total_forwarded(), 50);
        assert_eq!(metrics.total_dropped(), 50);
        assert!(metrics.throughput_per_sec() > 0.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = StageMetrics::new();
        metrics.clone().record_received();
        assert_eq!(metrics.snapshot().total_received, 1);
    }

    #[test]
    fn test_flusher_metrics() {
        let metrics = FlusherMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_flush(3);
        assert_eq!(metrics.total_ticks(), 2);
        assert_eq!(metrics.total_flushes(), 1);
        assert_eq!(metrics.total_values_flushed(), 3);
        assert!(metrics.format().contains("Flushes: 1"));
    }
}
