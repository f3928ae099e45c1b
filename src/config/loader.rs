use crate::config::schema::{OutputConfig, RunConfig, default_delay};
use crate::error::{Error, Result};
use crate::output::{OutputHandler, console::ConsoleOutput, csv::CsvOutput, json::JsonOutput};
use crate::types::Strategy;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited, false)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        is_parent_load: bool,
    ) -> Result<RunConfig> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if !visited.insert(path.clone()) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }

        let config = Self::load_file(&path)?;

        let final_config = if let Some(parent_path_str) = &config.extends {
            let parent_path = path
                .parent()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    ))
                })?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited, true)?;
            Self::merge_configs(parent_config, config)
        } else {
            config
        };

        if !is_parent_load {
            Self::validate(&final_config)?;
        }

        Ok(final_config)
    }

    fn load_file(path: &Path) -> Result<RunConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    /// Field-level checks plus strategy sanity for the run and every target.
    pub fn validate(config: &RunConfig) -> Result<()> {
        config.validate()?;
        let mut names = HashSet::new();
        for target in &config.targets {
            target.validate()?;
            if !names.insert(target.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate target name: {}",
                    target.name
                )));
            }
            if let Some(strategy) = &target.strategy {
                strategy.validate()?;
            }
        }
        config.strategy.validate()
    }

    /// Child values win; targets are merged by name.
    fn merge_configs(mut parent: RunConfig, child: RunConfig) -> RunConfig {
        if !child.name.is_empty() {
            parent.name = child.name;
        }
        if child.strategy != Strategy::default() {
            parent.strategy = child.strategy;
        }
        if child.delay_ms != default_delay() {
            parent.delay_ms = child.delay_ms;
        }
        if child.database.is_some() {
            parent.database = child.database;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }

        for target in child.targets {
            match parent.targets.iter_mut().find(|t| t.name == target.name) {
                Some(existing) => *existing = target,
                None => parent.targets.push(target),
            }
        }

        parent.extends = None;
        parent
    }

    pub fn create_output(
        config: &RunConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn OutputHandler>> {
        let handler: Box<dyn OutputHandler> = match &config.output {
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Csv { path }) => Box::new(CsvOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Console) | None => Box::new(ConsoleOutput::new(multi)),
        };
        Ok(handler)
    }
}
