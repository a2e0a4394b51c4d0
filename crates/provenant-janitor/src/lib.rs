//! Provenant Janitor
//!
//! Batch maintenance for a Provenant store.
//!
//! # Overview
//!
//! The janitor is responsible for:
//! - **Bulk migration**: bringing every document up to its kind's latest
//!   schema version, recording documents that cannot be migrated instead of
//!   aborting
//! - **Relationship repair**: restoring mirrors missing from the counterpart
//!   side of an edge
//! - **Metrics collection**: tracking what each sweep did
//!
//! # Usage
//!
//! ## One-time Sweep
//!
//! ```no_run
//! use provenant_gatekeeper::Repository;
//! use provenant_janitor::Janitor;
//! use provenant_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut repo = Repository::new(SqliteStore::new("provenant.db")?);
//! let mut janitor = Janitor::default_config();
//!
//! let metrics = janitor.sweep(&mut repo)?;
//! println!("{}", metrics.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! sweep_interval_minutes = 60
//! kinds = ["IP", "Indicator"]
//! migrate_documents = true
//! repair_relationships = true
//! dry_run = false
//! batch_limit = 1000
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod janitor;
mod metrics;
mod worker;

pub use config::JanitorConfig;
pub use error::JanitorError;
pub use janitor::Janitor;
pub use metrics::{JanitorMetrics, SweepFailure};
pub use worker::JanitorWorker;
