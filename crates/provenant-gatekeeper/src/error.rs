//! Gatekeeper error types

use crate::RejectionReason;
use provenant_domain::{DomainError, TloId, TloKind};
use provenant_migrate::SchemaError;
use thiserror::Error;

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The document could not be brought to the current schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Validation refused the save
    #[error("{kind} {id} rejected: {}", format_reasons(.reasons))]
    Rejected {
        /// Kind of the rejected TLO
        kind: TloKind,
        /// Identifier of the rejected TLO
        id: TloId,
        /// Every rule that failed
        reasons: Vec<RejectionReason>,
    },

    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// The TLO could not be turned into a document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_reasons(reasons: &[RejectionReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from source and releasability edits made on behalf of a user
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// The user does not hold the source
    #[error("User '{user}' has no access to source '{source_name}'")]
    Denied {
        /// Acting user
        user: String,
        /// Source the user tried to act on
        source_name: String,
    },

    /// The edit itself was refused
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors loading configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A setting is out of range
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}
