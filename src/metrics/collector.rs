use crate::metrics::snapshot::{BackendSnapshot, MetricsSnapshot};
use crate::types::BackendKind;
use std::collections::BTreeMap;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

#[derive(Default)]
struct BackendCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    total_time_ms: AtomicU64,
}

/// Counters for one scraper instance's lifetime. Nothing here is persisted;
/// the intelligence store is the durable record.
#[derive(Clone)]
pub struct MetricsCollector {
    targets_queued: Arc<AtomicU64>,
    targets_processed: Arc<AtomicU64>,
    targets_succeeded: Arc<AtomicU64>,
    targets_failed: Arc<AtomicU64>,
    backend_attempts: Arc<AtomicU64>,
    accepted_attempts: Arc<AtomicU64>,
    total_response_time_ms: Arc<AtomicU64>,
    backends: Arc<[BackendCounters; 5]>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            targets_queued: Arc::new(AtomicU64::new(0)),
            targets_processed: Arc::new(AtomicU64::new(0)),
            targets_succeeded: Arc::new(AtomicU64::new(0)),
            targets_failed: Arc::new(AtomicU64::new(0)),
            backend_attempts: Arc::new(AtomicU64::new(0)),
            accepted_attempts: Arc::new(AtomicU64::new(0)),
            total_response_time_ms: Arc::new(AtomicU64::new(0)),
            backends: Arc::new(Default::default()),
            start_time: Arc::new(Instant::now()),
        }
    }
}

fn slot(kind: BackendKind) -> usize {
    BackendKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default()
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_targets_queued(&self, n: u64) {
        self.targets_queued.fetch_add(n, Ordering::SeqCst);
    }

    pub fn record_target(&self, success: bool) {
        self.targets_processed.fetch_add(1, Ordering::SeqCst);
        if success {
            self.targets_succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.targets_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_attempt(&self, backend: BackendKind, accepted: bool, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.backend_attempts.fetch_add(1, Ordering::SeqCst);
        self.total_response_time_ms.fetch_add(ms, Ordering::SeqCst);
        if accepted {
            self.accepted_attempts.fetch_add(1, Ordering::SeqCst);
        }

        let counters = &self.backends[slot(backend)];
        counters.attempts.fetch_add(1, Ordering::SeqCst);
        counters.total_time_ms.fetch_add(ms, Ordering::SeqCst);
        if accepted {
            counters.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let processed = self.targets_processed.load(Ordering::SeqCst);
        let succeeded = self.targets_succeeded.load(Ordering::SeqCst);
        let attempts = self.backend_attempts.load(Ordering::SeqCst);
        let total_time = self.total_response_time_ms.load(Ordering::SeqCst);

        let success_rate = if processed > 0 {
            (succeeded as f64 / processed as f64) * 100.0
        } else {
            0.0
        };

        let avg_response_time_ms = if attempts > 0 {
            total_time / attempts
        } else {
            0
        };

        let mut backends = BTreeMap::new();
        for kind in BackendKind::ALL {
            let counters = &self.backends[slot(kind)];
            let attempts = counters.attempts.load(Ordering::SeqCst);
            if attempts == 0 {
                continue;
            }
            let successes = counters.successes.load(Ordering::SeqCst);
            backends.insert(
                kind,
                BackendSnapshot {
                    attempts,
                    successes,
                    success_rate: (successes as f64 / attempts as f64) * 100.0,
                    avg_response_time_ms: counters.total_time_ms.load(Ordering::SeqCst) / attempts,
                },
            );
        }

        MetricsSnapshot {
            targets_queued: self.targets_queued.load(Ordering::SeqCst),
            targets_processed: processed,
            targets_succeeded: succeeded,
            targets_failed: self.targets_failed.load(Ordering::SeqCst),
            backend_attempts: attempts,
            accepted_attempts: self.accepted_attempts.load(Ordering::SeqCst),
            success_rate,
            avg_response_time_ms,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            backends,
        }
    }
}
