use crate::error::{Error, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content-container selector taken from a run file.
///
/// Keeps the source text next to the compiled selector so it serialises back
/// unchanged and shows up readably in result metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CssSelector {
    css: String,
    selector: Selector,
}

/// Containers tried in order when a page gives no better hint.
const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "article",
    ".article-content",
    ".content",
    ".post-content",
    ".entry-content",
    ".story-body",
    "main",
    ".main-content",
];

pub fn default_content_selectors() -> Vec<CssSelector> {
    DEFAULT_CONTENT_SELECTORS
        .iter()
        .filter_map(|css| css.parse().ok())
        .collect()
}

impl CssSelector {
    pub fn as_css(&self) -> &str {
        &self.css
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl FromStr for CssSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let css = s.trim();
        let selector = Selector::parse(css)
            .map_err(|e| Error::Config(format!("Invalid selector {:?}: {:?}", css, e)))?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }
}

impl PartialEq for CssSelector {
    fn eq(&self, other: &Self) -> bool {
        self.css == other.css
    }
}

impl Eq for CssSelector {}

impl TryFrom<String> for CssSelector {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CssSelector> for String {
    fn from(selector: CssSelector) -> Self {
        selector.css
    }
}

impl fmt::Display for CssSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css)
    }
}
