use crate::error::Result;
use crate::types::ScrapeResult;
use async_trait::async_trait;
use serde::Serialize;

pub mod console;
pub mod csv;
pub mod json;

/// One finished target as handed to an output sink.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub target: String,
    pub category: Option<String>,
    /// `scrape()` calls made for this target, retries included.
    pub attempts: u32,
    #[serde(flatten)]
    pub result: ScrapeResult,
}

#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, item: &TargetResult) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
