use crate::error::{Error, Result};
use crate::selector::CssSelector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The fixed set of fetch strategies the orchestrator can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Main-content extraction fetch; the default first choice.
    #[serde(alias = "crawl4ai")]
    Crawler,
    /// Plain HTTP GET plus selector-driven text extraction.
    #[serde(alias = "requests")]
    Http,
    /// Scripted headless Chrome.
    #[serde(alias = "playwright")]
    Headless,
    /// Full WebDriver automation.
    #[serde(alias = "selenium")]
    Browser,
    /// RSS/Atom feed parsing.
    #[serde(rename = "feedparser", alias = "feed")]
    Feed,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Crawler,
        BackendKind::Http,
        BackendKind::Headless,
        BackendKind::Browser,
        BackendKind::Feed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Crawler => "crawler",
            BackendKind::Http => "http",
            BackendKind::Headless => "headless",
            BackendKind::Browser => "browser",
            BackendKind::Feed => "feedparser",
        }
    }

    /// Backends that drive a real browser engine.
    pub fn is_browser(&self) -> bool {
        matches!(self, BackendKind::Headless | BackendKind::Browser)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crawler" | "crawl4ai" => Ok(BackendKind::Crawler),
            "http" | "requests" => Ok(BackendKind::Http),
            "headless" | "playwright" => Ok(BackendKind::Headless),
            "browser" | "selenium" => Ok(BackendKind::Browser),
            "feedparser" | "feed" => Ok(BackendKind::Feed),
            other => Err(Error::Config(format!("Unknown backend: {}", other))),
        }
    }
}

/// Host (and explicit port) of a URL, lower-cased. Used as the statistics key.
pub fn domain_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            }
        }
        Err(_) => String::new(),
    }
}

/// One recorded backend invocation. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub url: String,
    pub domain: String,
    pub backend: BackendKind,
    pub success: bool,
    pub response_time: f64,
    pub content_length: usize,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Attempt {
    pub fn new(
        url: &str,
        backend: BackendKind,
        success: bool,
        response_time: f64,
        content_length: usize,
        error_message: Option<String>,
    ) -> Self {
        Self {
            url: url.to_string(),
            domain: domain_of(url),
            backend,
            success,
            response_time,
            content_length,
            error_message,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Uniform value returned by every backend adapter and by the orchestrator.
///
/// `content` and `word_count` are private so the count can only ever be
/// derived from the content it describes.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub url: String,
    pub success: bool,
    content: String,
    pub title: String,
    pub metadata: Map<String, Value>,
    #[serde(rename = "scraper_used", serialize_with = "serialize_backend")]
    pub backend: Option<BackendKind>,
    pub response_time: f64,
    word_count: usize,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
}

fn serialize_backend<S: Serializer>(
    backend: &Option<BackendKind>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(backend.map(|b| b.as_str()).unwrap_or("none"))
}

impl ScrapeResult {
    /// A fetched page. Adapters report `success` whenever they produced any text.
    pub fn new(url: &str, content: String, title: String) -> Self {
        let word_count = content.split_whitespace().count();
        Self {
            url: url.to_string(),
            success: !content.trim().is_empty(),
            content,
            title,
            metadata: Map::new(),
            backend: None,
            response_time: 0.0,
            word_count,
            error_message: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(url: &str, error_message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            content: String::new(),
            title: String::new(),
            metadata: Map::new(),
            backend: None,
            response_time: 0.0,
            word_count: 0,
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Content length in characters, the unit of the acceptance floor.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// `"none"` when no backend produced an accepted result.
    pub fn scraper_used(&self) -> &'static str {
        self.backend.map(|b| b.as_str()).unwrap_or("none")
    }
}

/// Per-target hints handed to every adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetOptions {
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Content-container selectors tried before the built-in table.
    #[serde(default)]
    pub selectors: Vec<CssSelector>,

    /// Text blocks with fewer words than this are dropped by the crawler backend.
    #[serde(default)]
    pub min_word_count: Option<usize>,
}

/// Backend ordering, timeout, retry and pacing for one `scrape()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default = "default_primary")]
    pub primary: BackendKind,

    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<BackendKind>,

    /// Per-attempt timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Outer retries performed by the batch runner, not by `scrape()` itself.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Minimum spacing between requests to one domain, seconds.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
}

fn default_primary() -> BackendKind {
    BackendKind::Crawler
}

fn default_fallbacks() -> Vec<BackendKind> {
    vec![BackendKind::Http, BackendKind::Headless, BackendKind::Browser]
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_rate_limit() -> f64 {
    2.0
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallbacks: default_fallbacks(),
            timeout: default_timeout(),
            retries: default_retries(),
            rate_limit: default_rate_limit(),
        }
    }
}

impl Strategy {
    pub fn new(primary: BackendKind, fallbacks: Vec<BackendKind>) -> Self {
        Self {
            primary,
            fallbacks,
            ..Self::default()
        }
    }

    pub fn with_rate_limit(mut self, seconds: f64) -> Self {
        self.rate_limit = seconds;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            return Err(Error::InvalidStrategy("timeout must be at least 1s".into()));
        }
        if Duration::try_from_secs_f64(self.rate_limit).is_err() {
            return Err(Error::InvalidStrategy(format!(
                "rate_limit must be a non-negative, representable number of seconds, got {}",
                self.rate_limit
            )));
        }
        Ok(())
    }

    /// `[primary] + fallbacks` with duplicates removed, first occurrence wins.
    pub fn default_order(&self) -> Vec<BackendKind> {
        let mut order = Vec::with_capacity(1 + self.fallbacks.len());
        for kind in std::iter::once(self.primary).chain(self.fallbacks.iter().copied()) {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        order
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Zero for values `validate()` rejects.
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.rate_limit).unwrap_or_default()
    }
}
