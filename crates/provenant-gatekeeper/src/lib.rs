//! Provenant Gatekeeper
//!
//! Everything between callers and the document store:
//! - Save-time validation of TLOs
//! - The repository sequencing save/delete hooks (validation, version stamp,
//!   timestamps, audit, cascade) and migrating reads
//! - A static access policy and guards for source/releasability edits
//! - The sanitization pipeline producing per-user views
//!
//! # Examples
//!
//! ```no_run
//! use provenant_gatekeeper::{Gatekeeper, Repository, ValidationConfig};
//! use provenant_store::SqliteStore;
//!
//! let store = SqliteStore::new("provenant.db").unwrap();
//! let repo = Repository::new(store)
//!     .with_gatekeeper(Gatekeeper::new(ValidationConfig::strict()));
//!
//! // Validate and persist TLOs
//! // repo.save(&mut tlo, "alice")?;
//! ```

#![warn(missing_docs)]

mod access;
mod audit;
mod config;
mod error;
mod repository;
mod sanitize;
mod validator;

pub use access::{AccessGuard, AccessPolicy, UserAccess};
pub use audit::{NoopCascade, RecordingAuditSink, RecordingCascade, TracingAuditSink};
pub use config::ValidationConfig;
pub use error::{AccessError, ConfigError, RepositoryError};
pub use repository::Repository;
pub use sanitize::Sanitizer;
pub use validator::{Gatekeeper, RejectionReason, ValidationResult, ValidationStatus};
