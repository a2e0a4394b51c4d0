//! Provenant Schema Migration Engine
//!
//! Every stored document records the schema version it was written with.
//! Reading a document older than the current version for its kind runs the
//! kind's migration chain, one version at a time, persisting after each step.
//!
//! # Examples
//!
//! ```no_run
//! use provenant_domain::{TloId, TloKind};
//! use provenant_migrate::Migrator;
//! use provenant_store::SqliteStore;
//!
//! let mut store = SqliteStore::new("provenant.db").unwrap();
//! let migrator = Migrator::default();
//! let tlo = migrator.load_by_id(&mut store, TloKind::Ip, TloId::new()).unwrap();
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod migrator;
pub mod registry;
pub mod steps;

pub use error::SchemaError;
pub use migrator::Migrator;
pub use registry::{MigrationChain, MigrationRegistry, MigrationStep, StepFn};
