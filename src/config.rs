//! Engine configuration loaded from TOML

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::Flavor;

/// Errors that can occur when loading or parsing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration for the reconciliation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target schema flavor; selects the binding resolver table
    pub flavor: Flavor,

    /// Mirror the applied template id/version onto the element as attributes
    pub stamp_template: bool,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::Zeebe,
            stamp_template: false,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string; missing keys take defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the target flavor
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Enable or disable template stamping
    pub fn with_stamp_template(mut self, stamp: bool) -> Self {
        self.stamp_template = stamp;
        self
    }

    /// Set the fallback log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
