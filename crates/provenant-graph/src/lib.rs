//! Provenant Graph
//!
//! Maintains the bidirectional relationship graph between TLOs. Every edge
//! `A --R--> B` is mirrored as `B --inverse(R)--> A`; the manager creates,
//! changes, removes and repairs both sides together and cascades new
//! relationships of versioned variants to their family record.
//!
//! # Examples
//!
//! ```no_run
//! use provenant_graph::{Counterpart, RelationshipManager, RelationshipRequest};
//! # use provenant_domain::{Tlo, TloKind, TloId};
//! # use provenant_gatekeeper::Repository;
//! # use provenant_store::SqliteStore;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut repo = Repository::new(SqliteStore::in_memory()?);
//! # let mut ip = Tlo::new(TloKind::Ip);
//! # let domain_id = TloId::new();
//! let manager = RelationshipManager::default();
//! let request = RelationshipRequest::new("Resolved_To", "alice");
//!
//! let outcome = manager.add_relationship(
//!     &mut repo,
//!     &mut ip,
//!     Counterpart::Reference { kind: TloKind::Domain, id: domain_id },
//!     &request,
//! )?;
//! println!("{}", outcome.message());
//! repo.save(&mut ip, "alice")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod edit;
mod error;
mod maintenance;
mod manager;

pub use config::GraphConfig;
pub use edit::RelationshipChange;
pub use error::RelationshipError;
pub use maintenance::RelatedObject;
pub use manager::{Counterpart, RelationshipManager, RelationshipOutcome, RelationshipRequest};
