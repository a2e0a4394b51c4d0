//! Relationship graph error types

use provenant_domain::{TloId, TloKind};
use provenant_gatekeeper::RepositoryError;
use provenant_migrate::SchemaError;
use thiserror::Error;

/// Errors that can occur while maintaining relationships
#[derive(Error, Debug)]
pub enum RelationshipError {
    /// The label is not in the relationship table
    #[error("Unknown relationship type: {0}")]
    UnknownType(String),

    /// Both endpoints are the same TLO
    #[error("{kind} {id} cannot be related to itself")]
    SelfRelationship {
        /// Kind of the TLO
        kind: TloKind,
        /// Identifier of the TLO
        id: TloId,
    },

    /// The counterpart does not exist
    #[error("Counterpart {kind} {id} not found")]
    CounterpartNotFound {
        /// Kind of the missing counterpart
        kind: TloKind,
        /// Identifier of the missing counterpart
        id: TloId,
    },

    /// No edge matches the request
    #[error("Relationship not found: {0}")]
    EdgeNotFound(String),

    /// A document could not be brought to the current schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Store or validation failure
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RelationshipError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Schema(schema) => RelationshipError::Schema(schema),
            other => RelationshipError::Repository(other),
        }
    }
}

