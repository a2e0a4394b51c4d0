//! Core janitor implementation: bulk migration and mirror repair

use crate::{JanitorConfig, JanitorError, JanitorMetrics};
use provenant_domain::traits::DocumentStore;
use provenant_domain::{DocumentFilter, TloId, TloKind};
use provenant_gatekeeper::{Repository, RepositoryError};
use provenant_graph::{RelationshipError, RelationshipManager};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error, info};

/// Janitor service for batch maintenance of stored TLOs
///
/// A sweep visits every configured kind and:
/// 1. Migrates documents below the kind's latest schema version
/// 2. Restores missing relationship mirrors
///
/// A document that cannot be migrated or loaded is recorded as a failure
/// and the sweep moves on.
///
/// # Examples
///
/// ```no_run
/// use provenant_gatekeeper::Repository;
/// use provenant_janitor::{Janitor, JanitorConfig};
/// use provenant_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut repo = Repository::new(SqliteStore::new("provenant.db")?);
/// let mut janitor = Janitor::new(JanitorConfig::default());
///
/// let metrics = janitor.sweep(&mut repo)?;
/// println!("{}", metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    manager: RelationshipManager,
    metrics: JanitorMetrics,
    /// Last document repaired per kind when sweeps are batched
    repair_cursor: BTreeMap<TloKind, TloId>,
}

impl Janitor {
    /// Create a new janitor with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        Self {
            config,
            manager: RelationshipManager::default(),
            metrics: JanitorMetrics::new(),
            repair_cursor: BTreeMap::new(),
        }
    }

    /// Create a janitor with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Use a specific relationship manager for repairs
    pub fn with_manager(mut self, manager: RelationshipManager) -> Self {
        self.manager = manager;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Perform a complete sweep cycle
    ///
    /// Returns the accumulated metrics after the sweep.
    pub fn sweep<S: DocumentStore>(
        &mut self,
        repo: &mut Repository<S>,
    ) -> Result<JanitorMetrics, JanitorError> {
        let start = Instant::now();

        for kind in self.config.target_kinds() {
            if self.config.migrate_documents {
                self.migrate_kind(repo, kind)?;
            }
            if self.config.repair_relationships && !self.config.dry_run {
                self.repair_kind(repo, kind)?;
            }
        }

        self.metrics.record_sweep();
        self.metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        Ok(self.metrics.clone())
    }

    /// Migrate the outdated documents of one kind
    fn migrate_kind<S: DocumentStore>(
        &mut self,
        repo: &mut Repository<S>,
        kind: TloKind,
    ) -> Result<usize, JanitorError> {
        let filter = DocumentFilter {
            schema_version_below: Some(kind.latest_schema_version()),
            limit: self.config.batch_limit,
            ..DocumentFilter::default()
        };
        let ids = repo.find_ids(kind, &filter)?;

        if ids.is_empty() {
            debug!("No outdated {} documents", kind);
            return Ok(0);
        }

        if self.config.dry_run {
            info!(
                "DRY RUN: {} {} document(s) below schema version {}",
                ids.len(),
                kind,
                kind.latest_schema_version()
            );
            self.metrics.record_outdated(kind, ids.len());
            return Ok(0);
        }

        let mut migrated = 0;
        for id in ids {
            match repo.upgrade(kind, id) {
                Ok(Some((from, to))) => {
                    debug!("Migrated {} {} from v{} to v{}", kind, id, from, to);
                    self.metrics.record_migration(kind);
                    migrated += 1;
                }
                Ok(None) => {}
                Err(RepositoryError::Schema(err)) => self.record_failure(kind, id, &err),
                Err(err) => return Err(err.into()),
            }
        }

        info!("Migrated {} {} document(s)", migrated, kind);
        Ok(migrated)
    }

    /// Restore missing mirrors for the documents of one kind
    ///
    /// With a batch limit each sweep resumes after the last document the
    /// previous sweep visited, wrapping to the start once a kind is exhausted.
    fn repair_kind<S: DocumentStore>(
        &mut self,
        repo: &mut Repository<S>,
        kind: TloKind,
    ) -> Result<usize, JanitorError> {
        let filter = DocumentFilter {
            id_after: self.repair_cursor.get(&kind).copied(),
            limit: self.config.batch_limit,
            ..DocumentFilter::default()
        };
        let ids = repo.find_ids(kind, &filter)?;

        match (self.config.batch_limit, ids.last()) {
            (Some(limit), Some(last)) if ids.len() >= limit => {
                self.repair_cursor.insert(kind, *last);
            }
            _ => {
                self.repair_cursor.remove(&kind);
            }
        }

        let mut repaired = 0;
        for id in ids {
            let tlo = match repo.load(kind, id) {
                Ok(Some(tlo)) => tlo,
                Ok(None) => continue,
                Err(RepositoryError::Schema(err)) => {
                    self.record_failure(kind, id, &err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            match self.manager.repair_relationships(repo, &tlo) {
                Ok(count) => {
                    self.metrics.record_repairs(kind, count);
                    repaired += count;
                }
                Err(RelationshipError::Schema(err)) => self.record_failure(kind, id, &err),
                Err(err) => return Err(err.into()),
            }
        }

        if repaired > 0 {
            info!("Restored {} relationship mirror(s) for {}", repaired, kind);
        }
        Ok(repaired)
    }

    fn record_failure(&mut self, kind: TloKind, id: TloId, err: &dyn std::error::Error) {
        error!("Skipping {} {}: {}", kind, id, err);
        self.metrics.record_failure(kind, id, err.to_string());
    }
}
