use super::{Backend, fetch_page};
use crate::error::{Error, Result};
use crate::types::{BackendKind, ScrapeResult, TargetOptions};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;

const MAX_LINKS: usize = 200;

/// Readability-style main-content extraction. The default first choice.
pub struct CrawlerBackend {
    client: Client,
}

impl CrawlerBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Backend for CrawlerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Crawler
    }

    async fn fetch(
        &self,
        url: &str,
        target: &TargetOptions,
        timeout: Duration,
    ) -> Result<ScrapeResult> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Extraction(format!("invalid url {}: {}", url, e)))?;
        let page = fetch_page(&self.client, url, target, timeout).await?;

        let mut cursor = Cursor::new(page.body.as_bytes());
        let product = readability::extractor::extract(&mut cursor, &parsed)
            .map_err(|e| Error::Extraction(e.to_string()))?;

        let content = filter_blocks(&product.text, target.min_word_count);
        let links = collect_links(&product.content);

        Ok(ScrapeResult::new(url, content, product.title.trim().to_string())
            .with_metadata("content_type", page.content_type)
            .with_metadata("links", json!(links)))
    }
}

/// Drops text blocks below the target's word threshold.
fn filter_blocks(text: &str, min_words: Option<usize>) -> String {
    let blocks = text
        .split("\n\n")
        .map(|block| block.trim())
        .filter(|block| !block.is_empty());

    match min_words {
        Some(min) if min > 0 => blocks
            .filter(|block| block.split_whitespace().count() >= min)
            .collect::<Vec<_>>()
            .join("\n\n"),
        _ => blocks.collect::<Vec<_>>().join("\n\n"),
    }
}

fn collect_links(html: &str) -> Vec<String> {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links: Vec<String> = Vec::new();
    for href in Html::parse_fragment(html)
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
    {
        if links.len() >= MAX_LINKS {
            break;
        }
        if !href.starts_with('#') && !links.iter().any(|l| l == href) {
            links.push(href.to_string());
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_threshold_drops_short_blocks() {
        let text = "Menu\n\nThe copper price rose sharply on supply fears today.\n\n\nShare";
        assert_eq!(
            filter_blocks(text, Some(5)),
            "The copper price rose sharply on supply fears today."
        );
        assert_eq!(filter_blocks(text, None).split("\n\n").count(), 3);
    }

    #[test]
    fn links_are_deduplicated() {
        let html = r##"<div><a href="/a">A</a><a href="/a">again</a><a href="#top">top</a><a href="/b">B</a></div>"##;
        assert_eq!(collect_links(html), vec!["/a".to_string(), "/b".to_string()]);
    }
}
