use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub success_rate: f64,
    pub unique_domains: u64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperSummary {
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub domain: String,
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
}

/// Aggregate view over a trailing window, consumed by reporting layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceReport {
    pub period_days: u32,
    pub overall: OverallSummary,
    /// Most successes first.
    pub scrapers: IndexMap<String, ScraperSummary>,
    pub top_domains: Vec<DomainSummary>,
    pub generated_at: DateTime<Utc>,
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
