//! Provenant Domain Layer
//!
//! This crate contains the data model shared by every top-level object (TLO)
//! kind of the threat-intelligence substrate, along with the trait interfaces
//! the other layers implement.
//!
//! ## Key Concepts
//!
//! - **TLO**: A primary entity (IP, Domain, Sample, ...) carrying the common
//!   substrate: sources, releasability, relationships and a schema version
//! - **Source**: Provenance record naming who supplied the TLO, under which TLP
//! - **Releasability**: Permission to share a TLO with an additional source
//! - **Relationship**: A typed edge stored on *both* endpoints, each side
//!   carrying the label read from its own perspective
//! - **Kind registry**: Static per-kind behaviour (latest schema version,
//!   source scoping, family handling)
//!
//! ## Architecture
//!
//! - Pure data and in-memory operations only
//! - Persistence, migration and graph maintenance live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod confidence;
pub mod document;
pub mod error;
pub mod id;
pub mod kind;
pub mod relationship;
pub mod releasability;
pub mod source;
pub mod tlo;
pub mod tlp;
pub mod traits;

// Re-exports for convenience
pub use confidence::Confidence;
pub use document::{Document, DocumentFilter, FieldCondition, Projection};
pub use error::DomainError;
pub use id::TloId;
pub use kind::{KindDescriptor, TloKind};
pub use relationship::{EdgeKey, RelationshipEdge, RelationshipType};
pub use releasability::{ReleasabilityEntry, ReleaseInstance};
pub use source::{SourceEntry, SourceInstance, HIDDEN_SOURCE_NAME};
pub use tlo::Tlo;
pub use tlp::Tlp;

/// Current Unix time in seconds
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
