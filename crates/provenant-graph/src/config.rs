//! Relationship graph configuration

use provenant_gatekeeper::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for relationship maintenance
///
/// # Examples
///
/// ```
/// use provenant_graph::GraphConfig;
///
/// let config = GraphConfig::default();
/// assert!(config.cascade_to_family);
/// assert_eq!(config.max_cascade_depth, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Also relate family records when a versioned variant is related
    pub cascade_to_family: bool,

    /// How many family hops a single request may cascade through
    pub max_cascade_depth: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cascade_to_family: true,
            max_cascade_depth: 2,
        }
    }
}

impl GraphConfig {
    /// Configuration that never touches family records
    pub fn without_cascade() -> Self {
        Self {
            cascade_to_family: false,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GraphConfig::from_toml_str("max_cascade_depth = 1").unwrap();
        assert!(config.cascade_to_family);
        assert_eq!(config.max_cascade_depth, 1);
    }

    #[test]
    fn test_without_cascade() {
        assert!(!GraphConfig::without_cascade().cascade_to_family);
    }
}
