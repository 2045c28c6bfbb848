//! Per-batch metrics.
//!
//! The executor reports one [`BatchStats`] per batch to an optional
//! [`MetricsReporter`]. Two reporters ship with the crate:
//!
//! - [`InMemoryMetrics`]: lock-free totals plus per-destination aggregates
//! - [`TracingMetrics`]: one `info!` event per batch

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Fail,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Success => "success",
            BatchStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for one executed batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    /// Backend name (driver name, e.g. "postgres").
    pub backend: String,
    /// Schema identifier the batch targeted.
    pub destination: String,
    /// Number of requests in the batch.
    pub rows: usize,
    /// Wall-clock time of the processor call.
    pub duration: Duration,
    pub status: BatchStatus,
}

/// Receives batch statistics.
///
/// Called synchronously on the executing task; implementations must not
/// block.
pub trait MetricsReporter: Send + Sync {
    fn record_batch(&self, stats: &BatchStats);
}

/// Aggregates for one destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DestinationMetrics {
    /// Number of batches reported.
    pub batches: u64,
    /// Number of failed batches.
    pub failures: u64,
    /// Rows across all batches.
    pub rows: u64,
    /// Sum of batch latency in nanoseconds.
    pub latency_ns: u64,
}

/// In-process metrics reporter.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    batches: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rows: AtomicU64,
    latency_ns_total: AtomicU64,
    by_destination: Mutex<BTreeMap<String, DestinationMetrics>>,
}

/// Immutable snapshot view of [`InMemoryMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub successes: u64,
    pub failures: u64,
    pub rows: u64,
    pub latency_ns_total: u64,
    pub by_destination: BTreeMap<String, DestinationMetrics>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures a point-in-time view of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_destination = self
            .by_destination
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            latency_ns_total: self.latency_ns_total.load(Ordering::Relaxed),
            by_destination,
        }
    }

    /// Aggregates for one destination, if it has been reported.
    pub fn destination(&self, name: &str) -> Option<DestinationMetrics> {
        self.by_destination
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .copied()
    }

    /// Renders counters as `key=value` lines.
    pub fn render_text(&self) -> String {
        let s = self.snapshot();
        let mut out = format!(
            "batches={}\nbatch_successes={}\nbatch_failures={}\nrows={}\nlatency_ns_total={}\n",
            s.batches, s.successes, s.failures, s.rows, s.latency_ns_total
        );
        for (dest, m) in &s.by_destination {
            out.push_str(&format!(
                "destination_{dest}_batches={}\ndestination_{dest}_failures={}\ndestination_{dest}_rows={}\ndestination_{dest}_latency_ns={}\n",
                m.batches, m.failures, m.rows, m.latency_ns
            ));
        }
        out
    }
}

impl MetricsReporter for InMemoryMetrics {
    fn record_batch(&self, stats: &BatchStats) {
        let rows = stats.rows as u64;
        let latency_ns = stats.duration.as_nanos().min(u64::MAX as u128) as u64;
        let failed = stats.status == BatchStatus::Fail;

        self.batches.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.successes.fetch_add(1, Ordering::Relaxed);
        }
        self.rows.fetch_add(rows, Ordering::Relaxed);
        self.latency_ns_total.fetch_add(latency_ns, Ordering::Relaxed);

        let mut by_destination = self
            .by_destination
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let dest = by_destination.entry(stats.destination.clone()).or_default();
        dest.batches = dest.batches.saturating_add(1);
        dest.failures = dest.failures.saturating_add(u64::from(failed));
        dest.rows = dest.rows.saturating_add(rows);
        dest.latency_ns = dest.latency_ns.saturating_add(latency_ns);
    }
}

/// Reporter that logs each batch through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl TracingMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsReporter for TracingMetrics {
    fn record_batch(&self, stats: &BatchStats) {
        info!(
            "{} batch to {}: {} rows in {:.2}ms ({})",
            stats.backend,
            stats.destination,
            stats.rows,
            stats.duration.as_secs_f64() * 1000.0,
            stats.status
        );
    }
}
