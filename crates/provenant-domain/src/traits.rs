//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the substrate and its
//! collaborators. Implementations live in other crates (or in the embedding
//! application).

use crate::{Document, DocumentFilter, Projection, TloId, TloKind};
use serde_json::Value;
use std::collections::BTreeSet;

/// Trait for storing and retrieving TLO documents
///
/// Implemented by the infrastructure layer (provenant-store). Documents are
/// grouped by kind; identifiers are unique within a kind.
pub trait DocumentStore {
    /// Error type for store operations
    type Error: std::fmt::Display;

    /// Get a full document by identifier
    fn find_by_id(&self, kind: TloKind, id: &TloId) -> Result<Option<Document>, Self::Error>;

    /// Find documents matching a filter, returning only the projected fields
    fn find(
        &self,
        kind: TloKind,
        filter: &DocumentFilter,
        projection: &Projection,
    ) -> Result<Vec<Document>, Self::Error>;

    /// Insert or fully replace a document (keyed by its `_id` field)
    fn replace(&mut self, kind: TloKind, doc: &Document) -> Result<(), Self::Error>;

    /// Delete a document, returning whether it existed
    fn delete_by_id(&mut self, kind: TloKind, id: &TloId) -> Result<bool, Self::Error>;

    /// Atomically append `value` to the array `field` of one document
    ///
    /// The append is skipped when an equal element is already present.
    /// Returns `false` when the document does not exist or nothing was added.
    fn append_to_array(
        &mut self,
        kind: TloKind,
        id: &TloId,
        field: &str,
        value: Value,
    ) -> Result<bool, Self::Error>;
}

/// Identity and access service
///
/// Implemented by the embedding application (or the static policy in
/// provenant-gatekeeper).
pub trait AccessService {
    /// Names of the sources the user may see
    fn sources_for(&self, user: &str) -> BTreeSet<String>;

    /// Whether the user is an administrator
    fn is_admin(&self, user: &str) -> bool;
}

/// Operation recorded by the audit sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditOperation {
    /// Document saved
    Save,
    /// Document deleted
    Delete,
}

impl AuditOperation {
    /// Get the operation name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Save => "save",
            AuditOperation::Delete => "delete",
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Kind of the affected TLO
    pub kind: TloKind,
    /// Identifier of the affected TLO
    pub id: TloId,
    /// User performing the operation
    pub user: String,
    /// What happened
    pub operation: AuditOperation,
    /// When it happened (Unix seconds)
    pub timestamp: u64,
}

/// Receives an event for every save and delete
///
/// Delivery and storage are the sink's responsibility; the substrate never
/// waits on or fails because of it.
pub trait AuditSink {
    /// Record an audit event
    fn record(&self, event: &AuditEvent);
}

/// Post-delete cleanup of data owned by other subsystems
///
/// Comments, analysis results and similar artifacts pointing at a deleted
/// TLO are removed by the implementor.
pub trait CascadeCleanup {
    /// Remove artifacts that refer to the deleted TLO
    fn cleanup(&self, kind: TloKind, id: &TloId);
}
