//! Per-user views of TLOs
//!
//! A sanitized view only names sources the viewer holds and only keeps
//! edges to objects the viewer can see. Views are flagged and can never be
//! saved.

use crate::{Repository, RepositoryError};
use provenant_domain::traits::{AccessService, DocumentStore};
use provenant_domain::{Tlo, TloId, TloKind};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Produces sanitized views through an access service
#[derive(Debug, Clone)]
pub struct Sanitizer<A: AccessService> {
    access: A,
}

impl<A: AccessService> Sanitizer<A> {
    /// Create a sanitizer
    pub fn new(access: A) -> Self {
        Self { access }
    }

    /// Access service in use
    pub fn access(&self) -> &A {
        &self.access
    }

    /// Whether the user may see the TLO at all
    ///
    /// Kinds that are not source-scoped are visible to everyone.
    pub fn can_view(&self, tlo: &Tlo, user: &str) -> bool {
        if !tlo.kind().is_source_scoped() {
            return true;
        }
        let allowed = self.access.sources_for(user);
        tlo.sources().iter().any(|s| allowed.contains(&s.name))
    }

    /// Build the user's view of a TLO
    ///
    /// Each edge to a source-scoped target costs one store lookup checking
    /// the target exists and carries a source the user holds.
    pub fn sanitize<S: DocumentStore>(
        &self,
        repo: &Repository<S>,
        tlo: &Tlo,
        user: &str,
    ) -> Result<Tlo, RepositoryError> {
        let allowed = self.access.sources_for(user);
        let mut view = tlo.sanitized_view(&allowed);

        let mut visible: HashMap<(TloKind, TloId), bool> = HashMap::new();
        for edge in tlo.relationships() {
            if !edge.target_kind.is_source_scoped() {
                continue;
            }
            let key = (edge.target_kind, edge.target_id);
            if visible.contains_key(&key) {
                continue;
            }
            let seen = repo.has_any_source(edge.target_kind, edge.target_id, &allowed)?;
            visible.insert(key, seen);
        }

        let before = view.relationships().len();
        view.retain_relationships(|edge| {
            visible
                .get(&(edge.target_kind, edge.target_id))
                .copied()
                .unwrap_or(true)
        });
        let dropped = before - view.relationships().len();
        if dropped > 0 {
            debug!(
                "Hid {} relationship(s) of {} {} from {}",
                dropped,
                tlo.kind(),
                tlo.id(),
                user
            );
        }

        Ok(view)
    }

    /// Sources of a user, for callers composing their own filters
    pub fn allowed_sources(&self, user: &str) -> BTreeSet<String> {
        self.access.sources_for(user)
    }
}
