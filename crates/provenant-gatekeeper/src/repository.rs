//! Save and delete with explicit pre- and post-hooks
//!
//! Saving runs validation, stamps the schema version and timestamps, writes
//! the document and then records an audit event. Deleting removes the
//! document, records an audit event and hands the identifier to the cascade
//! collaborator. Reads go through the migration engine.

use crate::audit::{NoopCascade, TracingAuditSink};
use crate::{Gatekeeper, RepositoryError};
use provenant_domain::document::{id_of, RELATIONSHIPS_FIELD};
use provenant_domain::tlo::{NAME_ATTRIBUTE, VERSION_ATTRIBUTE};
use provenant_domain::traits::{AuditEvent, AuditOperation, AuditSink, CascadeCleanup, DocumentStore};
use provenant_domain::{
    current_timestamp, DocumentFilter, Projection, RelationshipEdge, Tlo, TloId, TloKind,
};
use provenant_migrate::Migrator;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Persistence entry point for TLOs
pub struct Repository<S: DocumentStore> {
    store: S,
    migrator: Migrator,
    gatekeeper: Gatekeeper,
    audit: Box<dyn AuditSink + Send + Sync>,
    cascade: Box<dyn CascadeCleanup + Send + Sync>,
}

impl<S: DocumentStore> Repository<S> {
    /// Create a repository with the built-in migrations, default validation,
    /// tracing audit and no cascade
    pub fn new(store: S) -> Self {
        Self {
            store,
            migrator: Migrator::default(),
            gatekeeper: Gatekeeper::default(),
            audit: Box::new(TracingAuditSink),
            cascade: Box::new(NoopCascade),
        }
    }

    /// Replace the migrator
    pub fn with_migrator(mut self, migrator: Migrator) -> Self {
        self.migrator = migrator;
        self
    }

    /// Replace the gatekeeper
    pub fn with_gatekeeper(mut self, gatekeeper: Gatekeeper) -> Self {
        self.gatekeeper = gatekeeper;
        self
    }

    /// Replace the audit sink
    pub fn with_audit_sink(mut self, sink: impl AuditSink + Send + Sync + 'static) -> Self {
        self.audit = Box::new(sink);
        self
    }

    /// Replace the cascade collaborator
    pub fn with_cascade(mut self, cascade: impl CascadeCleanup + Send + Sync + 'static) -> Self {
        self.cascade = Box::new(cascade);
        self
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying store, mutably
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Migration engine in use
    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Validator in use
    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    /// Load a TLO, migrating it to the current schema when needed
    pub fn load(&mut self, kind: TloKind, id: TloId) -> Result<Option<Tlo>, RepositoryError> {
        Ok(self.migrator.load_by_id(&mut self.store, kind, id)?)
    }

    /// Migrate one stored TLO, reporting the version change if any
    pub fn upgrade(
        &mut self,
        kind: TloKind,
        id: TloId,
    ) -> Result<Option<(u32, u32)>, RepositoryError> {
        Ok(self.migrator.upgrade(&mut self.store, kind, id)?)
    }

    /// Identifiers of the documents matching a filter
    pub fn find_ids(
        &self,
        kind: TloKind,
        filter: &DocumentFilter,
    ) -> Result<Vec<TloId>, RepositoryError> {
        let docs = self
            .store
            .find(kind, filter, &Projection::ids_only())
            .map_err(|e| RepositoryError::Store(e.to_string()))?;
        Ok(docs.iter().filter_map(id_of).collect())
    }

    /// Load every TLO matching a filter
    pub fn find(
        &mut self,
        kind: TloKind,
        filter: &DocumentFilter,
    ) -> Result<Vec<Tlo>, RepositoryError> {
        let docs = self
            .store
            .find(kind, filter, &Projection::All)
            .map_err(|e| RepositoryError::Store(e.to_string()))?;

        let mut tlos = Vec::with_capacity(docs.len());
        for doc in docs {
            tlos.push(self.migrator.load(&mut self.store, kind, doc)?);
        }
        Ok(tlos)
    }

    /// Whether a TLO exists and carries at least one of the given sources
    pub fn has_any_source(
        &self,
        kind: TloKind,
        id: TloId,
        sources: &BTreeSet<String>,
    ) -> Result<bool, RepositoryError> {
        let filter = DocumentFilter {
            limit: Some(1),
            ..DocumentFilter::by_id(id).with_sources(sources.iter().cloned())
        };
        Ok(!self.find_ids(kind, &filter)?.is_empty())
    }

    /// Load the unversioned family record with the given name
    pub fn find_family(
        &mut self,
        kind: TloKind,
        name: &str,
    ) -> Result<Option<Tlo>, RepositoryError> {
        let filter = DocumentFilter {
            limit: Some(1),
            ..DocumentFilter::default()
                .field_equals(NAME_ATTRIBUTE, name)
                .field_absent(VERSION_ATTRIBUTE)
        };
        Ok(self.find(kind, &filter)?.into_iter().next())
    }

    /// Validate and persist a TLO
    ///
    /// The first save stamps the latest schema version and the creation
    /// time; every save refreshes the modification time. The TLO is only
    /// updated once the write succeeded.
    pub fn save(&mut self, tlo: &mut Tlo, user: &str) -> Result<(), RepositoryError> {
        let result = self.gatekeeper.validate(tlo);
        if !result.is_accepted() {
            debug!("Rejected save of {} {}: {:?}", tlo.kind(), tlo.id(), result.reasons);
            return Err(RepositoryError::Rejected {
                kind: tlo.kind(),
                id: tlo.id(),
                reasons: result.reasons,
            });
        }

        let now = current_timestamp();
        let mut staged = tlo.clone();
        staged.mark_saved(now);

        let doc = staged.to_document()?;
        self.store
            .replace(staged.kind(), &doc)
            .map_err(|e| RepositoryError::Store(e.to_string()))?;
        *tlo = staged;

        info!("Saved {} {} (schema version {})", tlo.kind(), tlo.id(), tlo.schema_version());
        self.audit.record(&AuditEvent {
            kind: tlo.kind(),
            id: tlo.id(),
            user: user.to_string(),
            operation: AuditOperation::Save,
            timestamp: now,
        });

        Ok(())
    }

    /// Delete a stored TLO, returning whether it existed
    ///
    /// Mirrored edges on counterparts are not touched here; the graph layer
    /// removes them before calling this.
    pub fn delete(&mut self, kind: TloKind, id: TloId, user: &str) -> Result<bool, RepositoryError> {
        let existed = self
            .store
            .delete_by_id(kind, &id)
            .map_err(|e| RepositoryError::Store(e.to_string()))?;

        if !existed {
            debug!("Delete of {} {} found nothing", kind, id);
            return Ok(false);
        }

        info!("Deleted {} {}", kind, id);
        self.audit.record(&AuditEvent {
            kind,
            id,
            user: user.to_string(),
            operation: AuditOperation::Delete,
            timestamp: current_timestamp(),
        });
        self.cascade.cleanup(kind, &id);

        Ok(true)
    }

    /// Atomically add an edge to a stored TLO's relationship list
    ///
    /// Returns `false` when the TLO does not exist or an identical edge is
    /// already stored.
    pub fn append_relationship(
        &mut self,
        kind: TloKind,
        id: TloId,
        edge: &RelationshipEdge,
    ) -> Result<bool, RepositoryError> {
        let value = serde_json::to_value(edge)?;
        self.store
            .append_to_array(kind, &id, RELATIONSHIPS_FIELD, value)
            .map_err(|e| RepositoryError::Store(e.to_string()))
    }
}
