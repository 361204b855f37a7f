//! Analysis configuration.
//!
//! Input paths and the item lists used for tagging are loaded here and passed
//! explicitly into the pipeline.

use crate::decode::PayloadShape;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "tft-analysis.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub inputs: InputPaths,
    #[serde(default)]
    pub payload: PayloadConfig,
    /// Items counted as defensive. Empty unless configured.
    #[serde(default)]
    pub defensive: ItemSet,
    /// Base components; everything else is a completed item.
    #[serde(default)]
    pub components: ItemSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputPaths {
    #[serde(default)]
    pub matches: Option<PathBuf>,
    #[serde(default)]
    pub items: Option<PathBuf>,
    #[serde(default)]
    pub champions: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// Column holding the nested payload; `players` then `champion` when unset.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub shape: PayloadShape,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSet {
    #[serde(default)]
    pub items: Vec<String>,
}

impl ItemSet {
    pub fn to_set(&self) -> HashSet<String> {
        self.items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

impl AnalysisConfig {
    /// Loads `path`, or the default file when `path` is `None`.
    ///
    /// An explicitly named file must exist; a missing default file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !config_path.exists() {
            if required {
                return Err(anyhow!(
                    "Config file {} does not exist",
                    config_path.display()
                ));
            }
            debug!("no config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Picks the command-line path when given, else the configured one.
pub fn resolve_input(
    cli: Option<PathBuf>,
    configured: Option<&PathBuf>,
    what: &str,
) -> Result<PathBuf> {
    cli.or_else(|| configured.cloned()).ok_or_else(|| {
        anyhow!(
            "No {} table given: pass --{} or set inputs.{} in the config file",
            what,
            what,
            what
        )
    })
}
