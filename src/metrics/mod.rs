pub mod collector;
pub mod snapshot;

pub use collector::MetricsCollector;
pub use snapshot::{BackendSnapshot, MetricsSnapshot};
