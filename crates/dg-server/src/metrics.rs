//! Service counters.
//!
//! Atomic operations only; no locks. Exposed as JSON by `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide counters.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_completed: AtomicU64,
    requests_failed: AtomicU64,
    requests_cancelled: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors_total: AtomicU64,
    generation_ms_sum: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub requests_cancelled: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors_total: u64,
    /// Cache hits over lookups, 0.0 when nothing was looked up.
    pub cache_hit_rate: f64,
    /// Failed over total, 0.0 when nothing was requested.
    pub error_rate: f64,
    /// Mean end-to-end latency of completed requests.
    pub mean_generation_ms: f64,
}

impl Metrics {
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, generation_ms: u64) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
        self.generation_ms_sum
            .fetch_add(generation_ms, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.requests_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.requests_total.load(Ordering::Relaxed);
        let completed = self.requests_completed.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        MetricsSnapshot {
            requests_total: total,
            requests_completed: completed,
            requests_failed: failed,
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            errors_total: self.errors_total.load(Ordering::Relaxed),
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            error_rate: if total == 0 {
                0.0
            } else {
                failed as f64 / total as f64
            },
            mean_generation_ms: if completed == 0 {
                0.0
            } else {
                self.generation_ms_sum.load(Ordering::Relaxed) as f64 / completed as f64
            },
        }
    }
}
