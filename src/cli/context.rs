use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rule_engine::RuleEngine;

use super::output::OutputFormat;
use crate::config::RunnerConfig;

pub struct CliContext {
    config: RunnerConfig,
    config_path: Option<PathBuf>,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: RunnerConfig, config_path: Option<PathBuf>, output: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn json(&self) -> bool {
        self.output == OutputFormat::Json
    }

    /// Open the configured rule and memory stores
    pub fn open_engine(&self) -> Result<RuleEngine> {
        let storage = &self.config.storage;
        RuleEngine::open(&storage.rules_path, &storage.memory_path).with_context(|| {
            format!(
                "Failed to open stores {} / {}",
                storage.rules_path.display(),
                storage.memory_path.display()
            )
        })
    }
}
