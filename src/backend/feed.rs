use super::{Backend, fetch_page};
use crate::error::{Error, Result};
use crate::types::{BackendKind, ScrapeResult, TargetOptions};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const MAX_ENTRIES: usize = 50;

/// RSS 2.0 with an Atom fallback, flattened into one text blob.
pub struct FeedBackend {
    client: Client,
}

impl FeedBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Default)]
struct FeedEntry {
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Default)]
struct ParsedFeed {
    title: String,
    description: String,
    updated: String,
    total_entries: usize,
    entries: Vec<FeedEntry>,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    if let Ok(channel) = rss::Channel::read_from(bytes) {
        return Ok(ParsedFeed {
            title: channel.title().trim().to_string(),
            description: channel.description().trim().to_string(),
            updated: channel
                .last_build_date()
                .or(channel.pub_date())
                .unwrap_or_default()
                .to_string(),
            total_entries: channel.items().len(),
            entries: channel
                .items()
                .iter()
                .take(MAX_ENTRIES)
                .map(|item| FeedEntry {
                    title: item.title().and_then(non_empty),
                    summary: item.description().and_then(non_empty),
                    published: item.pub_date().and_then(non_empty),
                    link: item.link().and_then(non_empty),
                })
                .collect(),
        });
    }

    if let Ok(feed) = atom_syndication::Feed::read_from(bytes) {
        return Ok(ParsedFeed {
            title: feed.title().to_string().trim().to_string(),
            description: feed
                .subtitle()
                .map(|s| s.as_str().trim().to_string())
                .unwrap_or_default(),
            updated: feed.updated().to_rfc3339(),
            total_entries: feed.entries().len(),
            entries: feed
                .entries()
                .iter()
                .take(MAX_ENTRIES)
                .map(|entry| FeedEntry {
                    title: non_empty(entry.title().as_str()),
                    summary: entry
                        .summary()
                        .and_then(|s| non_empty(s.as_str()))
                        .or_else(|| entry.content().and_then(|c| c.value()).and_then(non_empty)),
                    published: entry.published().map(|d| d.to_rfc3339()),
                    link: entry.links().first().and_then(|l| non_empty(l.href())),
                })
                .collect(),
        });
    }

    Err(Error::Feed("invalid feed or no entries found".into()))
}

fn render(feed: &ParsedFeed) -> String {
    let mut parts = Vec::new();
    if !feed.title.is_empty() {
        parts.push(format!("Feed: {}", feed.title));
    }
    if !feed.description.is_empty() {
        parts.push(format!("Description: {}", feed.description));
    }

    for entry in &feed.entries {
        let mut lines = Vec::new();
        if let Some(title) = &entry.title {
            lines.push(format!("Title: {}", title));
        }
        if let Some(summary) = &entry.summary {
            lines.push(format!("Summary: {}", summary));
        }
        if let Some(published) = &entry.published {
            lines.push(format!("Published: {}", published));
        }
        if let Some(link) = &entry.link {
            lines.push(format!("Link: {}", link));
        }
        if !lines.is_empty() {
            parts.push(lines.join("\n"));
        }
    }

    parts.join("\n\n---\n\n")
}

#[async_trait]
impl Backend for FeedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Feed
    }

    async fn fetch(
        &self,
        url: &str,
        target: &TargetOptions,
        timeout: Duration,
    ) -> Result<ScrapeResult> {
        let page = fetch_page(&self.client, url, target, timeout).await?;
        let feed = parse_feed(page.body.as_bytes())?;
        let title = if feed.title.is_empty() {
            "RSS Feed".to_string()
        } else {
            feed.title.clone()
        };

        Ok(ScrapeResult::new(url, render(&feed), title)
            .with_metadata("feed_entries", feed.total_entries)
            .with_metadata(
                "feed_info",
                json!({
                    "title": feed.title,
                    "description": feed.description,
                    "updated": feed.updated,
                }),
            ))
    }
}
