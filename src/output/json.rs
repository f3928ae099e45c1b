use super::{OutputHandler, TargetResult};
use crate::error::Result;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Streams results into a single JSON array.
pub struct JsonOutput {
    file: BufWriter<File>,
    first: bool,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?,
        );

        write!(file, "[")?;

        Ok(Self { file, first: true })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, item: &TargetResult) -> Result<()> {
        if !self.first {
            write!(self.file, ",")?;
        } else {
            self.first = false;
        }

        serde_json::to_writer(&mut self.file, item)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        write!(self.file, "]")?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScrapeResult;

    #[tokio::test]
    async fn writes_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/results.json");
        let mut output = JsonOutput::new(path.clone()).unwrap();
        for name in ["a", "b"] {
            output
                .write(&TargetResult {
                    target: name.into(),
                    category: Some("news".into()),
                    attempts: 1,
                    result: ScrapeResult::new("https://a.com", "body text".into(), "T".into()),
                })
                .await
                .unwrap();
        }
        output.close().await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["target"], "b");
        assert_eq!(items[0]["content"], "body text");
        assert_eq!(items[0]["scraper_used"], "none");
    }
}
