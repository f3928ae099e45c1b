use super::stats::{BackendPerformance, DomainStatistics};
use crate::types::BackendKind;

/// Attempts needed before learned data overrides the caller's order.
pub const MIN_SAMPLE_SIZE: u64 = 3;
pub const SUCCESS_WEIGHT: f64 = 0.7;
pub const SPEED_WEIGHT: f64 = 0.3;
/// Floor for the latency divisor.
pub const MIN_LATENCY: f64 = 0.1;

pub fn backend_score(perf: &BackendPerformance) -> f64 {
    let speed = 1.0 / perf.avg_response_time.max(MIN_LATENCY);
    SUCCESS_WEIGHT * perf.success_rate + SPEED_WEIGHT * speed
}

/// Learned order for a domain.
///
/// Below the sample floor the default order comes back untouched. Otherwise
/// backends that have succeeded at least once are ranked by score, and every
/// default backend not yet placed is appended, so nothing is ever dropped.
pub fn rank_backends(
    stats: Option<&DomainStatistics>,
    default_order: &[BackendKind],
) -> Vec<BackendKind> {
    let stats = match stats {
        Some(s) if s.total_attempts >= MIN_SAMPLE_SIZE => s,
        _ => return default_order.to_vec(),
    };

    let default_pos = |kind: &BackendKind| {
        default_order
            .iter()
            .position(|k| k == kind)
            .unwrap_or(usize::MAX)
    };

    let mut scored: Vec<(BackendKind, f64)> = stats
        .backends
        .iter()
        .filter(|(_, perf)| perf.attempts > 0 && perf.success_rate > 0.0)
        .map(|(kind, perf)| (*kind, backend_score(perf)))
        .collect();
    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| default_pos(&a.0).cmp(&default_pos(&b.0)))
    });

    let mut order: Vec<BackendKind> = scored.into_iter().map(|(kind, _)| kind).collect();
    for kind in default_order {
        if !order.contains(kind) {
            order.push(*kind);
        }
    }
    order
}
