//! Configuration for janitor sweeps

use provenant_domain::TloKind;
use provenant_gatekeeper::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the janitor service
///
/// # Examples
///
/// ```
/// use provenant_janitor::JanitorConfig;
///
/// let config = JanitorConfig::default();
/// assert_eq!(config.sweep_interval_minutes, 60);
/// assert!(config.kinds.is_empty());
///
/// let config = JanitorConfig::report_only();
/// assert!(config.dry_run);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// How often the worker sweeps (in minutes)
    pub sweep_interval_minutes: u64,

    /// Kinds to sweep; empty means every kind
    pub kinds: Vec<TloKind>,

    /// Bring documents below the latest schema version up to date
    pub migrate_documents: bool,

    /// Restore missing relationship mirrors
    pub repair_relationships: bool,

    /// Count outdated documents without migrating them; repair is skipped
    pub dry_run: bool,

    /// Maximum documents per kind and phase in one sweep
    pub batch_limit: Option<usize>,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_minutes: 60,
            kinds: Vec::new(),
            migrate_documents: true,
            repair_relationships: true,
            dry_run: false,
            batch_limit: None,
        }
    }
}

impl JanitorConfig {
    /// Migrate only; relationships are left alone
    pub fn migration_only() -> Self {
        Self {
            repair_relationships: false,
            ..Self::default()
        }
    }

    /// Report how many documents are outdated without writing anything
    pub fn report_only() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "sweep_interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.batch_limit == Some(0) {
            return Err(ConfigError::InvalidValue(
                "batch_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// Kinds a sweep visits
    pub fn target_kinds(&self) -> Vec<TloKind> {
        if self.kinds.is_empty() {
            TloKind::ALL.to_vec()
        } else {
            self.kinds.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JanitorConfig::default();
        assert_eq!(config.sweep_interval_minutes, 60);
        assert!(config.migrate_documents);
        assert!(config.repair_relationships);
        assert!(!config.dry_run);
        assert_eq!(config.batch_limit, None);
        assert_eq!(config.target_kinds().len(), TloKind::ALL.len());
    }

    #[test]
    fn test_presets() {
        assert!(!JanitorConfig::migration_only().repair_relationships);
        assert!(JanitorConfig::migration_only().migrate_documents);
        assert!(JanitorConfig::report_only().dry_run);
    }

    #[test]
    fn test_duration_conversion() {
        let config = JanitorConfig {
            sweep_interval_minutes: 5,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_from_toml_str() {
        let config = JanitorConfig::from_toml_str(
            r#"
            sweep_interval_minutes = 15
            kinds = ["IP", "Indicator"]
            batch_limit = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.sweep_interval_minutes, 15);
        assert_eq!(config.target_kinds(), vec![TloKind::Ip, TloKind::Indicator]);
        assert_eq!(config.batch_limit, Some(500));
        assert!(config.repair_relationships);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("janitor.toml");
        std::fs::write(&path, "dry_run = true\nrepair_relationships = false\n").unwrap();

        let config = JanitorConfig::from_file(&path).unwrap();
        assert!(config.dry_run);
        assert!(!config.repair_relationships);
        assert_eq!(config.sweep_interval_minutes, 60);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = JanitorConfig::from_toml_str("sweep_interval_minutes = 0");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = JanitorConfig::from_toml_str("batch_limit = 0");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        assert!(JanitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = JanitorConfig::from_toml_str(r#"kinds = ["Malware"]"#);
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }
}
