pub mod cache;
pub mod ranking;
pub mod report;
pub mod stats;
pub mod store;

pub use ranking::{MIN_SAMPLE_SIZE, rank_backends};
pub use report::IntelligenceReport;
pub use stats::{BackendPerformance, DomainStatistics};
pub use store::{IntelligenceOptions, ScraperIntelligence};
