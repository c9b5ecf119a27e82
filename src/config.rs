//! Report configuration.
//!
//! Loaded from an optional TOML file; every section falls back to defaults so
//! an empty file (or no file at all) is a valid configuration.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub tenants: TenantConfig,
    pub availability: AvailabilityConfig,
    pub history: HistoryConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TenantConfig {
    /// Extra long-form → short-code tenant aliases, merged over the built-in table.
    pub aliases: BTreeMap<String, String>,

    /// Drop the built-in alias table and use only `aliases`.
    pub replace_defaults: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Site codes starting with any of these prefixes are left out of zone averages.
    pub excluded_site_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// 1-based line number of the header row in the redeem extract.
    pub header_row: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { header_row: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            preview_rows: 5,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "loaded report config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.header_row == 0 {
            return Err(ConfigError::ValidationError(
                "history.header_row is 1-based and must be at least 1".to_string(),
            ));
        }
        for (from, to) in &self.tenants.aliases {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "tenant alias '{from}' -> '{to}' has an empty side"
                )));
            }
        }
        if self
            .availability
            .excluded_site_prefixes
            .iter()
            .any(|p| p.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "availability.excluded_site_prefixes contains an empty prefix".to_string(),
            ));
        }
        Ok(())
    }
}
