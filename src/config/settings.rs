use crate::backend::BrowserSettings;
use crate::error::Result;
use crate::intelligence::IntelligenceOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SCRAPER";

/// Process-wide settings: an optional settings file overlaid by `SCRAPER_*`
/// environment variables (e.g. `SCRAPER_DATABASE_PATH`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_stats_window_days")]
    pub stats_window_days: u32,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            stats_window_days: default_stats_window_days(),
            retention_days: default_retention_days(),
            webdriver_url: default_webdriver_url(),
            chrome_executable: None,
        }
    }
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn intelligence_options(&self) -> IntelligenceOptions {
        IntelligenceOptions {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            window_days: self.stats_window_days,
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            webdriver_url: self.webdriver_url.clone(),
            chrome_executable: self.chrome_executable.clone(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/databases/scraper_intelligence.db")
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_stats_window_days() -> u32 {
    30
}

fn default_retention_days() -> u32 {
    90
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
