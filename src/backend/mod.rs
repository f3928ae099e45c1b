use crate::error::{Error, Result};
use crate::types::{BackendKind, ScrapeResult, TargetOptions};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod crawler;
pub mod feed;
pub mod headless;
pub mod http;
pub mod webdriver;

pub use crawler::CrawlerBackend;
pub use feed::FeedBackend;
pub use headless::HeadlessBackend;
pub use http::HttpBackend;
pub use webdriver::WebDriverBackend;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// One way of turning a URL into a `ScrapeResult`.
///
/// Adapters report what they got. An `Err` means the backend could not
/// produce anything; judging whether the content is good enough is left to
/// the orchestrator.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn fetch(
        &self,
        url: &str,
        target: &TargetOptions,
        timeout: Duration,
    ) -> Result<ScrapeResult>;
}

/// Where the browser backends find their engines.
#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub chrome_executable: Option<PathBuf>,
}

/// Maps every `BackendKind` to its adapter.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All five adapters. Browser adapters compiled without their feature
    /// are still registered and fail with `Error::BackendUnavailable`.
    pub fn standard(browser: &BrowserSettings) -> Result<Self> {
        let client = http_client()?;
        Ok(Self::empty()
            .with(Arc::new(CrawlerBackend::new(client.clone())))
            .with(Arc::new(HttpBackend::new(client.clone())))
            .with(Arc::new(HeadlessBackend::new(browser.chrome_executable.clone())))
            .with(Arc::new(WebDriverBackend::new(browser.webdriver_url.clone())))
            .with(Arc::new(FeedBackend::new(client))))
    }

    pub fn with(mut self, backend: Arc<dyn Backend>) -> Self {
        self.register(backend);
        self
    }

    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn Backend>> {
        self.backends.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<_> = self.backends.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Shared client with a browser-like header set. Timeouts are applied per request.
pub fn http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/rss+xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

pub(crate) struct FetchedPage {
    pub body: String,
    pub content_type: String,
}

/// GET with target headers and a per-request timeout; non-2xx is an error.
pub(crate) async fn fetch_page(
    client: &Client,
    url: &str,
    target: &TargetOptions,
    timeout: Duration,
) -> Result<FetchedPage> {
    let mut request = client.get(url).timeout(timeout);
    for (name, value) in &target.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let res = request.send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(Error::Status(status.as_u16()));
    }

    let content_type = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = res.text().await?;
    log::debug!("{}: {} bytes ({})", url, body.len(), content_type);

    Ok(FetchedPage { body, content_type })
}
