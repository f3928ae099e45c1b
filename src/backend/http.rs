use super::{Backend, fetch_page};
use crate::error::Result;
use crate::extract::extract_page_text;
use crate::types::{BackendKind, ScrapeResult, TargetOptions};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Plain GET plus selector-driven text extraction.
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }

    async fn fetch(
        &self,
        url: &str,
        target: &TargetOptions,
        timeout: Duration,
    ) -> Result<ScrapeResult> {
        log::debug!("GET {}", url);
        let page = fetch_page(&self.client, url, target, timeout).await?;
        let text = extract_page_text(&page.body, &target.selectors);

        Ok(ScrapeResult::new(url, text.content, text.title)
            .with_metadata("content_type", page.content_type)
            .with_metadata("matched_selectors", json!(text.matched)))
    }
}
