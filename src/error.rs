use crate::types::BackendKind;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("{0} backend is not available in this build")]
    BackendUnavailable(BackendKind),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
