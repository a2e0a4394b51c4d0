//! Load-time forward migration
//!
//! Documents are migrated one version at a time. After every step the
//! document is persisted and reloaded, so a failure leaves it at the last
//! version that was written. There is no rollback.

use crate::error::SchemaError;
use crate::registry::MigrationRegistry;
use provenant_domain::document::{self, SCHEMA_VERSION_FIELD};
use provenant_domain::traits::DocumentStore;
use provenant_domain::{Document, Tlo, TloId, TloKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info};

type InFlightSet = Mutex<HashSet<(TloKind, TloId)>>;

/// Marks one document as being migrated until dropped
struct InFlight<'a> {
    set: &'a InFlightSet,
    key: (TloKind, TloId),
}

impl<'a> InFlight<'a> {
    /// Returns `None` when the document is already being migrated
    fn enter(set: &'a InFlightSet, kind: TloKind, id: TloId) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.insert((kind, id)) {
            Some(Self {
                set,
                key: (kind, id),
            })
        } else {
            None
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guard = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&self.key);
    }
}

/// Brings stored documents to the current schema as they are read
pub struct Migrator {
    registry: MigrationRegistry,
    in_flight: InFlightSet,
}

impl Migrator {
    /// Create a migrator over a registry
    pub fn new(registry: MigrationRegistry) -> Self {
        Self {
            registry,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Create a migrator over the built-in chains
    pub fn with_builtin_chains() -> Self {
        Self::new(MigrationRegistry::builtin())
    }

    /// Registry in use
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Whether a document is currently being migrated
    pub fn is_in_flight(&self, kind: TloKind, id: TloId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&(kind, id))
    }

    /// Turn a raw stored document into a current TLO
    ///
    /// Older documents are reloaded in full from the store (the raw document
    /// may be a projection) and stepped forward, persisting each version.
    pub fn load<S: DocumentStore>(
        &self,
        store: &mut S,
        kind: TloKind,
        raw: Document,
    ) -> Result<Tlo, SchemaError> {
        let id = document::id_of(&raw).ok_or(SchemaError::MissingIdentifier { kind })?;
        let version = document::schema_version_of(&raw);
        let latest = kind.latest_schema_version();

        if version == 0 {
            return Err(SchemaError::Unrecognized { kind, id });
        }
        if version > latest {
            return Err(SchemaError::AheadOfSoftware {
                kind,
                id,
                version,
                latest,
            });
        }
        if version == latest {
            return Self::deserialize(kind, id, raw);
        }

        let Some(_guard) = InFlight::enter(&self.in_flight, kind, id) else {
            debug!(
                "{} {} is already being migrated, returning it at version {}",
                kind, id, version
            );
            return Self::deserialize(kind, id, raw);
        };

        let doc = self.migrate(store, kind, id)?;
        Self::deserialize(kind, id, doc)
    }

    /// Load a document by identifier, migrating it when needed
    pub fn load_by_id<S: DocumentStore>(
        &self,
        store: &mut S,
        kind: TloKind,
        id: TloId,
    ) -> Result<Option<Tlo>, SchemaError> {
        match Self::fetch(store, kind, id)? {
            Some(raw) => self.load(store, kind, raw).map(Some),
            None => Ok(None),
        }
    }

    /// Migrate one stored document, reporting the version change if any
    pub fn upgrade<S: DocumentStore>(
        &self,
        store: &mut S,
        kind: TloKind,
        id: TloId,
    ) -> Result<Option<(u32, u32)>, SchemaError> {
        let raw = Self::fetch(store, kind, id)?.ok_or(SchemaError::Vanished { kind, id })?;
        let from = document::schema_version_of(&raw);
        let tlo = self.load(store, kind, raw)?;

        if tlo.schema_version() == from {
            Ok(None)
        } else {
            Ok(Some((from, tlo.schema_version())))
        }
    }

    /// Run the chain on the stored copy of a document
    fn migrate<S: DocumentStore>(
        &self,
        store: &mut S,
        kind: TloKind,
        id: TloId,
    ) -> Result<Document, SchemaError> {
        let latest = kind.latest_schema_version();
        let mut doc = Self::fetch(store, kind, id)?.ok_or(SchemaError::Vanished { kind, id })?;

        loop {
            let version = document::schema_version_of(&doc);
            if version == latest {
                return Ok(doc);
            }
            if version == 0 {
                return Err(SchemaError::Unrecognized { kind, id });
            }
            if version > latest {
                return Err(SchemaError::AheadOfSoftware {
                    kind,
                    id,
                    version,
                    latest,
                });
            }

            let step = self
                .registry
                .step(kind, version)
                .ok_or(SchemaError::MissingStep {
                    kind,
                    id: Some(id),
                    from: version,
                })?;

            (step.apply)(&mut doc).map_err(|source| SchemaError::StepFailed {
                kind,
                id,
                from: version,
                source,
            })?;
            doc.insert(
                SCHEMA_VERSION_FIELD.to_string(),
                Value::from(version + 1),
            );

            store
                .replace(kind, &doc)
                .map_err(|e| SchemaError::Store(e.to_string()))?;
            info!(
                "Migrated {} {} from version {} to {} ({})",
                kind,
                id,
                version,
                version + 1,
                step.description
            );

            doc = Self::fetch(store, kind, id)?.ok_or(SchemaError::Vanished { kind, id })?;
        }
    }

    fn fetch<S: DocumentStore>(
        store: &S,
        kind: TloKind,
        id: TloId,
    ) -> Result<Option<Document>, SchemaError> {
        store
            .find_by_id(kind, &id)
            .map_err(|e| SchemaError::Store(e.to_string()))
    }

    fn deserialize(kind: TloKind, id: TloId, doc: Document) -> Result<Tlo, SchemaError> {
        Tlo::from_document(kind, doc).map_err(|source| SchemaError::Malformed { kind, id, source })
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::with_builtin_chains()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let migrator = Migrator::default();
        let id = TloId::new();

        {
            let guard = InFlight::enter(&migrator.in_flight, TloKind::Ip, id);
            assert!(guard.is_some());
            assert!(migrator.is_in_flight(TloKind::Ip, id));
            assert!(InFlight::enter(&migrator.in_flight, TloKind::Ip, id).is_none());

            // Same id under another kind is a separate document
            assert!(InFlight::enter(&migrator.in_flight, TloKind::Domain, id).is_some());
        }

        assert!(!migrator.is_in_flight(TloKind::Ip, id));
    }
}
