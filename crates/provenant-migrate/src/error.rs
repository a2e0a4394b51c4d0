//! Error types for the migration engine

use provenant_domain::{TloId, TloKind};
use thiserror::Error;

/// Errors raised while bringing a stored document to the current schema
///
/// Every variant names the kind, and where one is known the identifier, of
/// the document involved.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema version is 0 or missing
    #[error("Unrecognized {kind} document {id}: no schema version")]
    Unrecognized {
        /// Document kind
        kind: TloKind,
        /// Document identifier
        id: TloId,
    },

    /// The document has no usable identifier
    #[error("Unrecognized {kind} document: missing or invalid identifier")]
    MissingIdentifier {
        /// Document kind
        kind: TloKind,
    },

    /// Stored version is newer than this software knows about
    #[error("{kind} document {id} is at schema version {version}, newer than supported {latest}")]
    AheadOfSoftware {
        /// Document kind
        kind: TloKind,
        /// Document identifier
        id: TloId,
        /// Stored version
        version: u32,
        /// Latest version known to this build
        latest: u32,
    },

    /// The document disappeared from the store mid-migration
    #[error("{kind} document {id} vanished during migration")]
    Vanished {
        /// Document kind
        kind: TloKind,
        /// Document identifier
        id: TloId,
    },

    /// No step is registered to leave a version
    #[error("No migration registered for {kind} from version {from}")]
    MissingStep {
        /// Document kind
        kind: TloKind,
        /// Document identifier, when a document was being migrated
        id: Option<TloId>,
        /// Version without an outgoing step
        from: u32,
    },

    /// A migration step failed; the document stays at `from`
    #[error("Migration of {kind} document {id} from version {from} failed: {source}")]
    StepFailed {
        /// Document kind
        kind: TloKind,
        /// Document identifier
        id: TloId,
        /// Version the failing step started from
        from: u32,
        /// Step failure
        #[source]
        source: anyhow::Error,
    },

    /// The migrated document does not match the current model
    #[error("{kind} document {id} is malformed: {source}")]
    Malformed {
        /// Document kind
        kind: TloKind,
        /// Document identifier
        id: TloId,
        /// Deserialization failure
        #[source]
        source: serde_json::Error,
    },

    /// Store operation failed
    #[error("Store error: {0}")]
    Store(String),
}

impl SchemaError {
    /// Kind of the document the error concerns
    pub fn kind(&self) -> Option<TloKind> {
        match self {
            SchemaError::Unrecognized { kind, .. }
            | SchemaError::MissingIdentifier { kind }
            | SchemaError::AheadOfSoftware { kind, .. }
            | SchemaError::Vanished { kind, .. }
            | SchemaError::MissingStep { kind, .. }
            | SchemaError::StepFailed { kind, .. }
            | SchemaError::Malformed { kind, .. } => Some(*kind),
            SchemaError::Store(_) => None,
        }
    }
}
