use crate::types::BackendKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub targets_queued: u64,
    pub targets_processed: u64,
    pub targets_succeeded: u64,
    pub targets_failed: u64,
    pub backend_attempts: u64,
    pub accepted_attempts: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
    pub elapsed_seconds: f64,
    pub backends: BTreeMap<BackendKind, BackendSnapshot>,
}
