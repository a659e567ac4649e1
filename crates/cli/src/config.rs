//! Configuration management for the CLI
//!
//! Defaults come from `~/.config/tonnage/config.json`, overridden by
//! `TONNAGE_*` environment variables. Command-line flags win over both.

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "TONNAGE";

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Default kubeconfig context
    pub context: Option<String>,
    /// Default node label selector
    pub node_selector: Option<String>,
    /// Default pod label selector
    pub pod_selector: Option<String>,
    /// Default output format
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load the user config file (if any) and the environment
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::build(None),
        }
    }

    /// Load `path` (if it exists) and the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(Some(path))
    }

    fn build(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read config file")?
            .try_deserialize()
            .context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("tonnage").join("config.json"))
    }
}
