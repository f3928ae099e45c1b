pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod intelligence;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod rate_limit;
pub mod routing;
pub mod runner;
pub mod selector;
pub mod types;

pub use backend::{Backend, BackendRegistry, BrowserSettings};
pub use error::{Error, Result};
pub use intelligence::{DomainStatistics, IntelligenceOptions, IntelligenceReport, ScraperIntelligence};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use orchestrator::{MIN_CONTENT_CHARS, UnifiedScraper};
pub use runner::{RunnerState, ScrapeJob, ScrapeRunner};
pub use types::{Attempt, BackendKind, ScrapeResult, Strategy, TargetOptions};
