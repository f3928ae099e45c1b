use crate::types::{Strategy, TargetOptions};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A batch run: which targets to scrape and how.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunConfig {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub targets: Vec<TargetConfig>,

    /// Used by every target that does not carry its own.
    #[serde(default)]
    pub strategy: Strategy,

    /// Pause between consecutive targets.
    #[serde(default = "default_delay")]
    pub delay_ms: u64,

    /// Overrides the settings' database path for this run.
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(url)]
    pub url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(flatten)]
    pub options: TargetOptions,

    #[serde(default)]
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json { path: String },
    Csv { path: String },
}

impl RunConfig {
    pub fn enabled_targets(&self) -> impl Iterator<Item = &TargetConfig> {
        self.targets.iter().filter(|t| t.enabled)
    }

    pub fn strategy_for<'a>(&'a self, target: &'a TargetConfig) -> &'a Strategy {
        target.strategy.as_ref().unwrap_or(&self.strategy)
    }
}

pub(crate) fn default_delay() -> u64 {
    2000
}

fn default_enabled() -> bool {
    true
}
