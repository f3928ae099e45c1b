use super::{OutputHandler, TargetResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

const HEADERS: [&str; 11] = [
    "target",
    "category",
    "url",
    "success",
    "scraper_used",
    "title",
    "word_count",
    "response_time",
    "attempts",
    "error_message",
    "timestamp",
];

/// Flat per-target rows; page content is left out.
pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
    headers_written: bool,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|e| Error::Internal(e.to_string()))?;

        Ok(Self {
            writer,
            headers_written: false,
        })
    }
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn write(&mut self, item: &TargetResult) -> Result<()> {
        if !self.headers_written {
            self.writer
                .write_record(HEADERS)
                .map_err(|e| Error::Internal(e.to_string()))?;
            self.headers_written = true;
        }

        let result = &item.result;
        let row = [
            item.target.clone(),
            item.category.clone().unwrap_or_default(),
            result.url.clone(),
            result.success.to_string(),
            result.scraper_used().to_string(),
            result.title.clone(),
            result.word_count().to_string(),
            format!("{:.3}", result.response_time),
            item.attempts.to_string(),
            result.error_message.clone(),
            result.timestamp.to_rfc3339(),
        ];
        self.writer
            .write_record(&row)
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
