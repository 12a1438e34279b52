//! Configuration
//!
//! Sources, lowest precedence first:
//! 1. `parley.toml` in the working directory, or the file given to
//!    [`ConfigBuilder::config_path`]
//! 2. `PARLEY_*` environment variables (`.env` is loaded first), nested keys
//!    separated by `__`, e.g. `PARLEY_EXECUTOR__MAX_STEPS=5000`
//! 3. Explicit builder overrides

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum commands dispatched by one `execute()` call; unlimited when unset
    pub max_steps: Option<usize>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_steps: Option<usize>,
}

impl ConfigBuilder {
    /// Use this file instead of searching for `parley.toml`; the file must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();

        builder = match &self.config_path {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::with_name("parley").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("PARLEY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Some(max_steps) = self.max_steps {
            config.executor.max_steps = Some(max_steps);
        }

        tracing::debug!(?config, "configuration loaded");

        Ok(config)
    }
}
