//! Error types for janitor operations

use provenant_gatekeeper::{ConfigError, RepositoryError};
use provenant_graph::RelationshipError;
use thiserror::Error;

/// Errors that abort a sweep
///
/// Per-document schema failures never abort a sweep; they are recorded in
/// the metrics instead.
#[derive(Error, Debug)]
pub enum JanitorError {
    /// Store or validation failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Relationship maintenance failure
    #[error("Relationship error: {0}")]
    Relationship(#[from] RelationshipError),

    /// The worker cannot run with this configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
