//! Creating mirrored relationships
//!
//! Every relationship is stored twice: once on each endpoint, each side
//! carrying the label read from its own perspective. Creating a relationship
//! reconciles whatever is already present on either side.

use crate::{GraphConfig, RelationshipError};
use provenant_domain::traits::DocumentStore;
use provenant_domain::{
    current_timestamp, Confidence, EdgeKey, RelationshipEdge, RelationshipType, Tlo, TloId,
    TloKind,
};
use provenant_gatekeeper::Repository;
use tracing::{debug, info};

/// The other endpoint of a relationship operation
#[derive(Debug)]
pub enum Counterpart<'a> {
    /// Already loaded by the caller; mutated in place
    Loaded(&'a mut Tlo),

    /// Loaded through the migration engine when needed
    Reference {
        /// Kind of the counterpart
        kind: TloKind,
        /// Identifier of the counterpart
        id: TloId,
    },
}

impl Counterpart<'_> {
    /// Kind and identifier of the counterpart
    pub fn kind_id(&self) -> (TloKind, TloId) {
        match self {
            Counterpart::Loaded(tlo) => (tlo.kind(), tlo.id()),
            Counterpart::Reference { kind, id } => (*kind, *id),
        }
    }
}

/// What a relationship request should record
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRequest {
    /// Label read from the caller's side (`Related_To`, `Related To`, ...)
    pub relationship: String,

    /// When the real-world relationship applies
    pub relationship_date: Option<u64>,

    /// Analyst asserting the relationship
    pub analyst: String,

    /// Analyst confidence
    pub confidence: Confidence,

    /// Free-text justification
    pub reason: String,
}

impl RelationshipRequest {
    /// Create a request with unknown confidence and no reason
    pub fn new(relationship: impl Into<String>, analyst: impl Into<String>) -> Self {
        Self {
            relationship: relationship.into(),
            relationship_date: None,
            analyst: analyst.into(),
            confidence: Confidence::Unknown,
            reason: String::new(),
        }
    }

    /// Set the relationship date
    pub fn with_date(mut self, date: u64) -> Self {
        self.relationship_date = Some(date);
        self
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// How a relationship request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipOutcome {
    /// Both sides already carried the edge
    AlreadyExists,

    /// Both sides were created
    Created,

    /// The caller's side existed; the counterpart's mirror was restored
    RepairedCounterpart,

    /// The counterpart's side existed; the caller's edge was restored
    RepairedOwner,
}

impl RelationshipOutcome {
    /// Message suitable for a user-facing response
    pub fn message(&self) -> &'static str {
        match self {
            RelationshipOutcome::AlreadyExists => "Relationship already exists",
            RelationshipOutcome::Created => "Relationship created",
            RelationshipOutcome::RepairedCounterpart => "Relationship repaired on counterpart",
            RelationshipOutcome::RepairedOwner => "Relationship repaired",
        }
    }

    /// Whether anything was written
    pub fn changed(&self) -> bool {
        *self != RelationshipOutcome::AlreadyExists
    }
}

/// One endpoint during a forge
///
/// Persisted sides are written with an atomic append; the others are only
/// changed in memory and saved by the caller.
pub(crate) struct Side<'t> {
    pub(crate) tlo: &'t mut Tlo,
    pub(crate) persist: bool,
}

/// Resolve a counterpart, loading it into `slot` when only referenced
///
/// Returns the counterpart and whether it was fetched here.
pub(crate) fn resolve<'c, S: DocumentStore>(
    repo: &mut Repository<S>,
    other: Counterpart<'c>,
    slot: &'c mut Option<Tlo>,
) -> Result<(&'c mut Tlo, bool), RelationshipError> {
    match other {
        Counterpart::Loaded(tlo) => Ok((tlo, false)),
        Counterpart::Reference { kind, id } => {
            let tlo = repo
                .load(kind, id)?
                .ok_or(RelationshipError::CounterpartNotFound { kind, id })?;
            Ok((slot.insert(tlo), true))
        }
    }
}

pub(crate) fn parse_relationship(label: &str) -> Result<RelationshipType, RelationshipError> {
    RelationshipType::parse(label).ok_or_else(|| RelationshipError::UnknownType(label.to_string()))
}

pub(crate) fn reject_self(
    me: &Tlo,
    kind: TloKind,
    id: TloId,
) -> Result<(), RelationshipError> {
    if me.kind() == kind && me.id() == id {
        return Err(RelationshipError::SelfRelationship { kind, id });
    }
    Ok(())
}

/// Maintains mirrored relationship edges
#[derive(Debug, Clone, Default)]
pub struct RelationshipManager {
    config: GraphConfig,
}

impl RelationshipManager {
    /// Create a manager with the given configuration
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Relate `me` to a counterpart
    ///
    /// The counterpart's new edge is written with an atomic append and never
    /// with a full save; `me` is only changed in memory and must be saved by
    /// the caller. When an endpoint is a versioned variant, the same
    /// relationship is also forged with its family record.
    pub fn add_relationship<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        me: &mut Tlo,
        other: Counterpart<'_>,
        request: &RelationshipRequest,
    ) -> Result<RelationshipOutcome, RelationshipError> {
        let relationship = parse_relationship(&request.relationship)?;
        let (kind, id) = other.kind_id();
        reject_self(me, kind, id)?;

        let mut slot = None;
        let (them, _) = resolve(repo, other, &mut slot)?;

        let mut mine = Side {
            tlo: me,
            persist: false,
        };
        let mut theirs = Side {
            tlo: them,
            persist: true,
        };

        let created = current_timestamp();
        self.forge(repo, &mut mine, &mut theirs, relationship, request, created, 0)
    }

    /// Reconcile `a --relationship--> b` on both sides, then cascade
    #[allow(clippy::too_many_arguments)]
    fn forge<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        a: &mut Side<'_>,
        b: &mut Side<'_>,
        relationship: RelationshipType,
        request: &RelationshipRequest,
        created: u64,
        depth: u32,
    ) -> Result<RelationshipOutcome, RelationshipError> {
        reject_self(a.tlo, b.tlo.kind(), b.tlo.id())?;

        let key = EdgeKey::new(
            b.tlo.kind(),
            b.tlo.id(),
            relationship,
            request.relationship_date,
        );
        let mirror_key = key.mirror(a.tlo.kind(), a.tlo.id());

        let existing_a = a.tlo.find_relationship(&key).cloned();
        let existing_b = b.tlo.find_relationship(&mirror_key).cloned();

        let outcome = match (existing_a, existing_b) {
            (Some(_), Some(_)) => RelationshipOutcome::AlreadyExists,
            (None, None) => {
                let edge = RelationshipEdge {
                    target_id: b.tlo.id(),
                    target_kind: b.tlo.kind(),
                    relationship,
                    relationship_date: request.relationship_date,
                    analyst: request.analyst.clone(),
                    confidence: request.confidence,
                    reason: request.reason.clone(),
                    created,
                };
                let mirror = edge.mirror(a.tlo.kind(), a.tlo.id());
                Self::attach(repo, b, mirror)?;
                Self::attach(repo, a, edge)?;
                RelationshipOutcome::Created
            }
            (Some(present), None) => {
                Self::attach(repo, b, present.mirror(a.tlo.kind(), a.tlo.id()))?;
                RelationshipOutcome::RepairedCounterpart
            }
            (None, Some(present)) => {
                Self::attach(repo, a, present.mirror(b.tlo.kind(), b.tlo.id()))?;
                RelationshipOutcome::RepairedOwner
            }
        };

        debug!(
            "{} {} {} {} {}: {}",
            a.tlo.kind(),
            a.tlo.id(),
            relationship,
            b.tlo.kind(),
            b.tlo.id(),
            outcome.message()
        );

        if self.config.cascade_to_family && depth < self.config.max_cascade_depth {
            if let Some(mut family) = self.family_of(repo, a.tlo, b.tlo)? {
                let mut family_side = Side {
                    tlo: &mut family,
                    persist: true,
                };
                let cascaded = self.forge(
                    repo,
                    &mut family_side,
                    b,
                    relationship,
                    request,
                    created,
                    depth + 1,
                )?;
                info!(
                    "Cascaded {} to family {} {}: {}",
                    relationship,
                    family.kind(),
                    family.id(),
                    cascaded.message()
                );
            }

            if let Some(mut family) = self.family_of(repo, b.tlo, a.tlo)? {
                let mut family_side = Side {
                    tlo: &mut family,
                    persist: true,
                };
                let cascaded = self.forge(
                    repo,
                    a,
                    &mut family_side,
                    relationship,
                    request,
                    created,
                    depth + 1,
                )?;
                info!(
                    "Cascaded {} to family {} {}: {}",
                    relationship,
                    family.kind(),
                    family.id(),
                    cascaded.message()
                );
            }
        }

        Ok(outcome)
    }

    /// Family record of `variant`, unless `partner` already is that record
    fn family_of<S: DocumentStore>(
        &self,
        repo: &mut Repository<S>,
        variant: &Tlo,
        partner: &Tlo,
    ) -> Result<Option<Tlo>, RelationshipError> {
        let Some(name) = variant.family_name() else {
            return Ok(None);
        };
        if variant.is_variant_of(partner) {
            return Ok(None);
        }

        let family = repo.find_family(variant.kind(), name)?;
        if family.is_none() {
            debug!("No family record '{}' for {} {}", name, variant.kind(), variant.id());
        }
        Ok(family.filter(|f| f.id() != partner.id() || f.kind() != partner.kind()))
    }

    /// Add an edge to one side, appending it to the store when that side is
    /// persisted here
    fn attach<S: DocumentStore>(
        repo: &mut Repository<S>,
        side: &mut Side<'_>,
        edge: RelationshipEdge,
    ) -> Result<(), RelationshipError> {
        if side.persist {
            let appended = repo.append_relationship(side.tlo.kind(), side.tlo.id(), &edge)?;
            if !appended {
                debug!(
                    "Append to {} {} changed nothing (not stored or already present)",
                    side.tlo.kind(),
                    side.tlo.id()
                );
            }
        }
        side.tlo.insert_relationship(edge);
        Ok(())
    }
}
