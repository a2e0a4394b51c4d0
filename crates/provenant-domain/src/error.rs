//! Errors raised by in-memory TLO operations

use crate::Tlp;
use thiserror::Error;

/// Errors from source, releasability and relationship mutations
///
/// These are validation failures: they are reported to the caller and the
/// TLO is left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Removing the source would leave the TLO with none
    #[error("A TLO must retain at least one source")]
    LastSource,

    /// No source entry with this name
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// No instance of the source recorded at this date
    #[error("Source '{source_name}' has no instance dated {date}")]
    SourceInstanceNotFound {
        /// Source name
        source_name: String,
        /// Instance date that was looked up
        date: u64,
    },

    /// Source names must not be empty
    #[error("Source name cannot be empty")]
    EmptySourceName,

    /// A source entry was supplied without any instance
    #[error("Source '{0}' has no instances")]
    EmptySource(String),

    /// The requested TLP is more permissive than the sources allow
    #[error("TLP '{requested}' is not acceptable (allowed: {allowed:?})")]
    TlpNotAcceptable {
        /// Requested level
        requested: Tlp,
        /// Levels the TLO's sources permit
        allowed: Vec<Tlp>,
    },

    /// No releasability entry with this name
    #[error("Releasability not found: {0}")]
    ReleasabilityNotFound(String),

    /// The entry has recorded releases and cannot be withdrawn
    #[error("Releasability '{name}' has {count} recorded release(s) and cannot be removed")]
    AlreadyReleased {
        /// Releasability source name
        name: String,
        /// Number of recorded release instances
        count: usize,
    },

    /// No release instance at this date
    #[error("Releasability '{name}' has no instance dated {date}")]
    ReleaseInstanceNotFound {
        /// Releasability source name
        name: String,
        /// Instance date that was looked up
        date: u64,
    },

    /// No relationship edge matching the key
    #[error("Relationship not found: {0}")]
    EdgeNotFound(String),

    /// Attribute name collides with a substrate field
    #[error("Field '{0}' is managed by the substrate and cannot be set as an attribute")]
    ReservedField(String),
}
