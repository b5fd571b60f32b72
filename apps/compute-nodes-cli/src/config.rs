//! Layered host configuration.
//!
//! Sources, later ones winning: built-in defaults, the YAML file given with
//! `--config`, `COMPUTE_NODES__*` environment variables (`__` separates
//! nesting levels), then command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use compute_nodes::ComputeNodesConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use inmemory_compute_plugin::InMemoryComputePluginConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "COMPUTE_NODES__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub manager: ComputeNodesConfig,
    pub inmemory: InMemoryComputePluginConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let inmemory = InMemoryComputePluginConfig::default();
        Self {
            logging: LoggingConfig::default(),
            manager: ComputeNodesConfig {
                provider: inmemory.provider_name.clone(),
                ..ComputeNodesConfig::default()
            },
            inmemory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            json: false,
        }
    }
}

/// Overrides taken from command-line flags.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub provider: Option<String>,
    pub group: Option<String>,
    pub json_logs: bool,
}

impl AppConfig {
    /// Loads defaults, then the optional YAML file, then the environment.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or any layer does not match the
    /// schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(provider) = &overrides.provider {
            self.manager.provider.clone_from(provider);
        }
        if let Some(group) = &overrides.group {
            self.manager.default_group.clone_from(group);
        }
        if overrides.json_logs {
            self.logging.json = true;
        }
    }
}
