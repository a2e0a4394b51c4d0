//! Changing and removing mirrored relationships
//!
//! The counterpart is always written first. If that write fails the caller's
//! TLO has not been touched yet.

use crate::manager::{parse_relationship, reject_self, resolve};
use crate::{Counterpart, RelationshipError, RelationshipManager};
use provenant_domain::traits::DocumentStore;
use provenant_domain::{Confidence, EdgeKey, RelationshipEdge, RelationshipType, Tlo, TloId, TloKind};
use provenant_gatekeeper::Repository;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A change applied to both sides of a relationship
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipChange {
    /// New label, read from the caller's side
    Type(RelationshipType),

    /// New relationship date
    Date(Option<u64>),

    /// New confidence
    Confidence(Confidence),

    /// New reason
    Reason(String),
}

impl RelationshipChange {
    /// Label change from a free-form label
    pub fn retype(label: &str) -> Result<Self, RelationshipError> {
        parse_relationship(label).map(RelationshipChange::Type)
    }

    /// Apply to one edge; the mirror receives the inverse label
    fn apply(&self, edge: &mut RelationshipEdge, mirrored: bool) {
        match self {
            RelationshipChange::Type(relationship) => {
                edge.relationship = if mirrored {
                    relationship.inverse()
                } else {
                    *relationship
                };
            }
            RelationshipChange::Date(date) => edge.relationship_date = *date,
            RelationshipChange::Confidence(confidence) => edge.confidence = *confidence,
            RelationshipChange::Reason(reason) => edge.reason = reason.clone(),
        }
    }
}

fn edge_not_found(key: &EdgeKey) -> RelationshipError {
    RelationshipError::EdgeNotFound(key.to_string())
}

/// Key of the edge on `me` that `requested` picks, with its actual date
fn concrete_key(me: &Tlo, requested: EdgeKey) -> Result<EdgeKey, RelationshipError> {
    me.find_relationship(&requested)
        .map(|edge| edge.key())
        .ok_or_else(|| edge_not_found(&requested))
}

impl RelationshipManager {
    /// Change one relationship on both sides
    ///
    /// A referenced counterpart is loaded, changed and saved here. A loaded
    /// counterpart and `me` are only changed in memory.
    #[allow(clippy::too_many_arguments)]
    pub fn modify_relationship<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        me: &mut Tlo,
        other: Counterpart<'_>,
        relationship: &str,
        relationship_date: Option<u64>,
        change: &RelationshipChange,
        user: &str,
    ) -> Result<(), RelationshipError> {
        let relationship = parse_relationship(relationship)?;
        let (kind, id) = other.kind_id();
        reject_self(me, kind, id)?;

        let key = concrete_key(me, EdgeKey::new(kind, id, relationship, relationship_date))?;
        let mirror_key = key.mirror(me.kind(), me.id());

        let mut slot = None;
        let (them, fetched) = resolve(repo, other, &mut slot)?;
        match them.update_relationship(&mirror_key, |edge| change.apply(edge, true)) {
            Ok(()) if fetched => repo.save(them, user)?,
            Ok(()) => {}
            Err(_) => warn!(
                "{} {} has no mirror of {}; changing one side only",
                kind, id, key
            ),
        }

        me.update_relationship(&key, |edge| change.apply(edge, false))
            .map_err(|_| edge_not_found(&key))?;

        info!("Modified relationship {} on {} {}", key, me.kind(), me.id());
        Ok(())
    }

    /// Remove one relationship from both sides
    ///
    /// Persistence follows the same rules as [`Self::modify_relationship`].
    pub fn delete_relationship<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        me: &mut Tlo,
        other: Counterpart<'_>,
        relationship: &str,
        relationship_date: Option<u64>,
        user: &str,
    ) -> Result<(), RelationshipError> {
        let relationship = parse_relationship(relationship)?;
        let (kind, id) = other.kind_id();

        let key = concrete_key(me, EdgeKey::new(kind, id, relationship, relationship_date))?;
        let mirror_key = key.mirror(me.kind(), me.id());

        let mut slot = None;
        let (them, fetched) = resolve(repo, other, &mut slot)?;
        match them.remove_relationship(&mirror_key) {
            Ok(_) if fetched => repo.save(them, user)?,
            Ok(_) => {}
            Err(_) => warn!("{} {} has no mirror of {}", kind, id, key),
        }

        me.remove_relationship(&key).map_err(|_| edge_not_found(&key))?;

        info!("Deleted relationship {} from {} {}", key, me.kind(), me.id());
        Ok(())
    }

    /// Remove every relationship of `me`, including the mirrors
    ///
    /// Each counterpart is loaded and saved once. Counterparts that no longer
    /// exist are skipped. Returns the number of edges removed from `me`.
    pub fn delete_all_relationships<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        me: &mut Tlo,
        user: &str,
    ) -> Result<usize, RelationshipError> {
        let mut by_counterpart: BTreeMap<(TloKind, TloId), Vec<EdgeKey>> = BTreeMap::new();
        for edge in me.relationships() {
            by_counterpart
                .entry((edge.target_kind, edge.target_id))
                .or_default()
                .push(edge.key().mirror(me.kind(), me.id()));
        }

        for ((kind, id), mirror_keys) in by_counterpart {
            if kind == me.kind() && id == me.id() {
                continue;
            }
            let Some(mut them) = repo.load(kind, id)? else {
                warn!("Counterpart {} {} of {} {} no longer exists", kind, id, me.kind(), me.id());
                continue;
            };

            let mut removed = 0;
            for mirror_key in &mirror_keys {
                if them.remove_relationship(mirror_key).is_ok() {
                    removed += 1;
                } else {
                    warn!("{} {} has no mirror {}", kind, id, mirror_key);
                }
            }
            if removed > 0 {
                repo.save(&mut them, user)?;
            }
        }

        let count = me.relationships().len();
        me.retain_relationships(|_| false);
        Ok(count)
    }

    /// Delete a TLO after removing its mirrored edges from every counterpart
    ///
    /// Returns whether the TLO was stored.
    pub fn delete_object<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        tlo: &mut Tlo,
        user: &str,
    ) -> Result<bool, RelationshipError> {
        let removed = self.delete_all_relationships(repo, tlo, user)?;
        let existed = repo.delete(tlo.kind(), tlo.id(), user)?;
        info!(
            "Deleted {} {} and {} relationship(s)",
            tlo.kind(),
            tlo.id(),
            removed
        );
        Ok(existed)
    }
}
