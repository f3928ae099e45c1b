use crate::types::BackendKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Percentage in [0, 100]; zero when nothing was attempted.
pub fn success_rate(successes: u64, attempts: u64) -> f64 {
    if attempts == 0 {
        return 0.0;
    }
    ((successes as f64 / attempts as f64) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendPerformance {
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
}

impl BackendPerformance {
    pub fn new(attempts: u64, successes: u64, avg_response_time: f64) -> Self {
        Self {
            attempts,
            successes,
            success_rate: success_rate(successes, attempts),
            avg_response_time,
        }
    }
}

/// Windowed performance of every backend tried against one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStatistics {
    pub domain: String,
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
    /// Highest success rate; `None` when every backend is at 0%.
    pub best_backend: Option<BackendKind>,
    pub backends: BTreeMap<BackendKind, BackendPerformance>,
}

impl DomainStatistics {
    /// Returns `None` when there is nothing to aggregate.
    pub fn from_backends(
        domain: &str,
        backends: BTreeMap<BackendKind, BackendPerformance>,
    ) -> Option<Self> {
        let total_attempts: u64 = backends.values().map(|p| p.attempts).sum();
        if total_attempts == 0 {
            return None;
        }
        let successful_attempts: u64 = backends.values().map(|p| p.successes).sum();
        let weighted_time: f64 = backends
            .values()
            .map(|p| p.avg_response_time * p.attempts as f64)
            .sum();

        let mut best_backend = None;
        let mut best_rate = 0.0;
        for (kind, perf) in &backends {
            if perf.attempts > 0 && perf.success_rate > best_rate {
                best_rate = perf.success_rate;
                best_backend = Some(*kind);
            }
        }

        Some(Self {
            domain: domain.to_string(),
            total_attempts,
            successful_attempts,
            success_rate: success_rate(successful_attempts, total_attempts),
            avg_response_time: weighted_time / total_attempts as f64,
            best_backend,
            backends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_backends() {
        let mut backends = BTreeMap::new();
        backends.insert(BackendKind::Crawler, BackendPerformance::new(4, 3, 2.0));
        backends.insert(BackendKind::Http, BackendPerformance::new(1, 1, 1.0));
        let stats = DomainStatistics::from_backends("a.com", backends).unwrap();

        assert_eq!(stats.total_attempts, 5);
        assert_eq!(stats.successful_attempts, 4);
        assert_eq!(stats.success_rate, 80.0);
        assert!((stats.avg_response_time - 1.8).abs() < 1e-9);
        assert_eq!(stats.best_backend, Some(BackendKind::Http));
    }

    #[test]
    fn zero_rate_backends_are_never_best() {
        let mut backends = BTreeMap::new();
        backends.insert(BackendKind::Http, BackendPerformance::new(3, 0, 1.0));
        let stats = DomainStatistics::from_backends("a.com", backends).unwrap();
        assert_eq!(stats.best_backend, None);
        assert!(DomainStatistics::from_backends("a.com", BTreeMap::new()).is_none());
    }
}
