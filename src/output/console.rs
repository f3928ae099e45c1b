use super::{OutputHandler, TargetResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

/// One summary line per target, printed above the progress bar when there is one.
pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

pub(crate) fn summary_line(item: &TargetResult) -> String {
    let result = &item.result;
    if result.success {
        format!(
            "[ok]   {} via {} in {:.2}s: {} words, {:?}",
            item.target,
            result.scraper_used(),
            result.response_time,
            result.word_count(),
            result.title
        )
    } else {
        format!(
            "[fail] {} after {} attempt(s): {}",
            item.target, item.attempts, result.error_message
        )
    }
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, item: &TargetResult) -> Result<()> {
        let line = summary_line(item);
        match &self.multi {
            Some(multi) => multi
                .println(line)
                .map_err(|e| Error::Internal(e.to_string()))?,
            None => println!("{}", line),
        }
        Ok(())
    }
}
