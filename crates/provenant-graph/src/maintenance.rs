//! Repairing mirrors and resolving related objects

use crate::{RelationshipError, RelationshipManager};
use provenant_domain::traits::{AccessService, DocumentStore};
use provenant_domain::{RelationshipEdge, Tlo, TloKind};
use provenant_gatekeeper::{Repository, Sanitizer};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A relationship edge together with the sanitized object it points at
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedObject {
    /// Edge as seen from the owner
    pub edge: RelationshipEdge,

    /// Sanitized view of the target
    pub object: Tlo,
}

impl RelationshipManager {
    /// Restore missing mirrors for every edge of `tlo`
    ///
    /// Mirrors are appended atomically; `tlo` itself is not changed and no
    /// family cascade happens. Returns the number of mirrors restored.
    pub fn repair_relationships<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        tlo: &Tlo,
    ) -> Result<usize, RelationshipError> {
        let mut repaired = 0;

        for edge in tlo.relationships() {
            if edge.target_kind == tlo.kind() && edge.target_id == tlo.id() {
                continue;
            }
            let Some(target) = repo.load(edge.target_kind, edge.target_id)? else {
                warn!(
                    "{} {} points at missing {} {}",
                    tlo.kind(),
                    tlo.id(),
                    edge.target_kind,
                    edge.target_id
                );
                continue;
            };

            let mirror = edge.mirror(tlo.kind(), tlo.id());
            if target.find_relationship(&mirror.key()).is_some() {
                continue;
            }
            if repo.append_relationship(target.kind(), target.id(), &mirror)? {
                debug!("Restored mirror {} on {} {}", mirror.key(), target.kind(), target.id());
                repaired += 1;
            }
        }

        Ok(repaired)
    }

    /// Objects related to `tlo` that `user` may see, grouped by kind
    ///
    /// Edges are read from the sanitized view of `tlo`; each target is
    /// returned sanitized. Missing targets are skipped.
    pub fn related_objects<S: DocumentStore, A: AccessService>(
        &self,
        repo: &mut Repository<S>,
        sanitizer: &Sanitizer<A>,
        tlo: &Tlo,
        user: &str,
    ) -> Result<BTreeMap<TloKind, Vec<RelatedObject>>, RelationshipError> {
        let view = sanitizer.sanitize(repo, tlo, user)?;
        let mut related: BTreeMap<TloKind, Vec<RelatedObject>> = BTreeMap::new();

        for edge in view.relationships() {
            let Some(target) = repo.load(edge.target_kind, edge.target_id)? else {
                continue;
            };
            if !sanitizer.can_view(&target, user) {
                continue;
            }
            let object = sanitizer.sanitize(repo, &target, user)?;
            related.entry(edge.target_kind).or_default().push(RelatedObject {
                edge: edge.clone(),
                object,
            });
        }

        Ok(related)
    }
}
