//! Gatekeeper configuration

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for save-time validation rules
///
/// Zero sources, sanitized views and hidden-source placeholders are always
/// rejected; everything here can be switched off.
///
/// # Examples
///
/// ```
/// use provenant_gatekeeper::ValidationConfig;
///
/// let config = ValidationConfig::from_toml_str("validate_tlp = false").unwrap();
/// assert!(!config.validate_tlp);
/// assert!(config.validate_relationships);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject empty, duplicated or instance-less source entries
    pub validate_source_names: bool,

    /// Reject self-relationships and duplicated edges
    pub validate_relationships: bool,

    /// Reject documents claiming a schema version newer than this build
    pub validate_schema_version: bool,

    /// Reject a TLO-level TLP outside the level set allowed by its sources
    pub validate_tlp: bool,

    /// Require a TLO-level TLP to be set
    pub require_tlp: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_source_names: true,
            validate_relationships: true,
            validate_schema_version: true,
            validate_tlp: true,
            require_tlp: false,
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (only the mandatory rules)
    pub fn permissive() -> Self {
        Self {
            validate_source_names: false,
            validate_relationships: false,
            validate_schema_version: false,
            validate_tlp: false,
            require_tlp: false,
        }
    }

    /// Create a strict configuration (all validations enabled)
    pub fn strict() -> Self {
        Self {
            require_tlp: true,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text; missing keys take defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
