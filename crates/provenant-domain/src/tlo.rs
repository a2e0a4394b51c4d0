//! The top-level object document shared by every entity kind

use crate::document::{Document, ID_FIELD};
use crate::{
    DomainError, EdgeKey, ReleaseInstance, ReleasabilityEntry, RelationshipEdge, SourceEntry,
    SourceInstance, TloId, TloKind, Tlp,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Attribute naming a record
pub const NAME_ATTRIBUTE: &str = "name";

/// Attribute holding a variant's version (empty on family records)
pub const VERSION_ATTRIBUTE: &str = "version";

const KIND_FIELD: &str = "kind";

/// Field names owned by the substrate; attributes may not shadow them
const RESERVED_FIELDS: [&str; 10] = [
    ID_FIELD,
    KIND_FIELD,
    "schema_version",
    "created",
    "modified",
    "tlp",
    "source",
    "releasability",
    "relationships",
    "sanitized",
];

/// A top-level object: any primary entity sharing the common substrate
///
/// The substrate collections (sources, releasability, relationships) are only
/// changed through the methods below. Entity-specific fields, including ones
/// unknown to the current schema, live in the attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tlo {
    #[serde(rename = "_id")]
    id: TloId,

    kind: TloKind,

    #[serde(default)]
    schema_version: u32,

    #[serde(default)]
    created: u64,

    #[serde(default)]
    modified: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tlp: Option<Tlp>,

    #[serde(default)]
    source: Vec<SourceEntry>,

    #[serde(default)]
    releasability: Vec<ReleasabilityEntry>,

    #[serde(default)]
    relationships: Vec<RelationshipEdge>,

    #[serde(flatten)]
    attributes: Map<String, Value>,

    /// Survives serialization so a view cannot be laundered into a save
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    sanitized: bool,
}

impl Tlo {
    /// Create a new, never-saved TLO
    ///
    /// The schema version stays 0 until the first save stamps the latest
    /// version for the kind.
    pub fn new(kind: TloKind) -> Self {
        Self::with_id(kind, TloId::new())
    }

    /// Create a new TLO with a known identifier
    pub fn with_id(kind: TloKind, id: TloId) -> Self {
        Self {
            id,
            kind,
            schema_version: 0,
            created: 0,
            modified: 0,
            tlp: None,
            source: Vec::new(),
            releasability: Vec::new(),
            relationships: Vec::new(),
            attributes: Map::new(),
            sanitized: false,
        }
    }

    /// Deserialize a stored document of the given kind
    ///
    /// The document must already be at the latest schema version.
    pub fn from_document(kind: TloKind, mut doc: Document) -> Result<Self, serde_json::Error> {
        doc.insert(KIND_FIELD.to_string(), Value::String(kind.as_str().to_string()));
        serde_json::from_value(Value::Object(doc))
    }

    /// Serialize into a storable document
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "TLO serialized to non-object JSON: {}",
                other
            ))),
        }
    }

    /// Identifier
    pub fn id(&self) -> TloId {
        self.id
    }

    /// Kind
    pub fn kind(&self) -> TloKind {
        self.kind
    }

    /// Stored schema version (0 before the first save)
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Creation time (Unix seconds, 0 before the first save)
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Last modification time (Unix seconds)
    pub fn modified(&self) -> u64 {
        self.modified
    }

    /// TLO-level TLP, if one was set
    pub fn tlp(&self) -> Option<Tlp> {
        self.tlp
    }

    /// Source entries
    pub fn sources(&self) -> &[SourceEntry] {
        &self.source
    }

    /// Releasability entries
    pub fn releasability(&self) -> &[ReleasabilityEntry] {
        &self.releasability
    }

    /// Relationship edges owned by this TLO
    pub fn relationships(&self) -> &[RelationshipEdge] {
        &self.relationships
    }

    /// Entity-specific attributes
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Get one attribute
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get one attribute as a string
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Set an entity-specific attribute
    ///
    /// Substrate-owned field names are refused.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) -> Result<(), DomainError> {
        let name = name.into();
        if RESERVED_FIELDS.contains(&name.as_str()) {
            return Err(DomainError::ReservedField(name));
        }
        self.attributes.insert(name, value);
        Ok(())
    }

    /// Record name, for kinds that carry one
    pub fn name(&self) -> Option<&str> {
        self.attribute_str(NAME_ATTRIBUTE)
    }

    /// Whether this is a view produced by sanitization
    pub fn is_sanitized(&self) -> bool {
        self.sanitized
    }

    /// Stamp bookkeeping fields before a save
    ///
    /// A never-saved TLO receives the latest schema version of its kind and
    /// its creation time; every save refreshes the modification time.
    pub fn mark_saved(&mut self, now: u64) {
        if self.schema_version == 0 {
            self.schema_version = self.kind.latest_schema_version();
        }
        if self.created == 0 {
            self.created = now;
        }
        self.modified = now;
    }

    // ----------------------------------------------------------------------
    // Sources
    // ----------------------------------------------------------------------

    /// Whether a source with this name is present
    pub fn has_source(&self, name: &str) -> bool {
        self.source.iter().any(|s| s.name == name)
    }

    /// Merge a source entry into the existing entry of the same name
    ///
    /// Instances identical on analyst, date, method and reference are not
    /// duplicated. Returns the number of instances added.
    pub fn add_source(&mut self, entry: SourceEntry) -> Result<usize, DomainError> {
        if entry.name.trim().is_empty() {
            return Err(DomainError::EmptySourceName);
        }
        if entry.instances.is_empty() {
            return Err(DomainError::EmptySource(entry.name));
        }

        match self.source.iter_mut().find(|s| s.name == entry.name) {
            Some(existing) => Ok(existing.merge(entry)),
            None => {
                let added = entry.instances.len();
                let mut fresh = SourceEntry {
                    name: entry.name.clone(),
                    instances: Vec::with_capacity(added),
                };
                let added = fresh.merge(entry);
                self.source.push(fresh);
                Ok(added)
            }
        }
    }

    /// Add a single instance to a (possibly new) named source
    pub fn add_source_instance(
        &mut self,
        name: impl Into<String>,
        instance: SourceInstance,
    ) -> Result<usize, DomainError> {
        self.add_source(SourceEntry::new(name, instance))
    }

    /// Remove a whole named source
    ///
    /// Refused when it is the last source.
    pub fn remove_source(&mut self, name: &str) -> Result<SourceEntry, DomainError> {
        let index = self
            .source
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| DomainError::SourceNotFound(name.to_string()))?;

        if self.source.len() == 1 {
            return Err(DomainError::LastSource);
        }

        Ok(self.source.remove(index))
    }

    /// Remove one instance (identified by date) of a named source
    ///
    /// Removing the only instance removes the entry, which is refused when
    /// it is the last source.
    pub fn remove_source_instance(
        &mut self,
        name: &str,
        date: u64,
    ) -> Result<SourceInstance, DomainError> {
        let entry_index = self
            .source
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| DomainError::SourceNotFound(name.to_string()))?;

        let instance_index = self.source[entry_index]
            .instances
            .iter()
            .position(|i| i.date == date)
            .ok_or_else(|| DomainError::SourceInstanceNotFound {
                source_name: name.to_string(),
                date,
            })?;

        if self.source[entry_index].instances.len() == 1 {
            if self.source.len() == 1 {
                return Err(DomainError::LastSource);
            }
            let mut entry = self.source.remove(entry_index);
            return Ok(entry.instances.remove(instance_index));
        }

        Ok(self.source[entry_index].instances.remove(instance_index))
    }

    /// TLP levels this TLO may be shared at
    ///
    /// The most permissive level among all source instances determines the
    /// cascade: white allows all four levels, red allows only red. Empty when
    /// there are no source instances.
    pub fn acceptable_tlp_levels(&self) -> Vec<Tlp> {
        self.source
            .iter()
            .filter_map(SourceEntry::most_permissive_tlp)
            .min()
            .map(|tlp| tlp.cascade())
            .unwrap_or_default()
    }

    /// Set the TLO-level TLP, constrained by the sources
    pub fn set_tlp(&mut self, tlp: Tlp) -> Result<(), DomainError> {
        let allowed = self.acceptable_tlp_levels();
        if !allowed.contains(&tlp) {
            return Err(DomainError::TlpNotAcceptable {
                requested: tlp,
                allowed,
            });
        }
        self.tlp = Some(tlp);
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Releasability
    // ----------------------------------------------------------------------

    /// Grant releasability to a source
    ///
    /// Returns `false` when the source already had an entry.
    pub fn add_releasability(&mut self, entry: ReleasabilityEntry) -> bool {
        if self.releasability.iter().any(|r| r.name == entry.name) {
            return false;
        }
        self.releasability.push(entry);
        true
    }

    /// Record a release under an existing releasability entry
    ///
    /// Returns `false` when a release with the same date is already recorded.
    pub fn add_release_instance(
        &mut self,
        name: &str,
        instance: ReleaseInstance,
    ) -> Result<bool, DomainError> {
        let entry = self
            .releasability
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| DomainError::ReleasabilityNotFound(name.to_string()))?;

        if entry.instances.iter().any(|i| i.date == instance.date) {
            return Ok(false);
        }
        entry.instances.push(instance);
        Ok(true)
    }

    /// Withdraw releasability from a source
    ///
    /// Only permitted while nothing has been released under the entry.
    pub fn remove_releasability(&mut self, name: &str) -> Result<ReleasabilityEntry, DomainError> {
        let index = self
            .releasability
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| DomainError::ReleasabilityNotFound(name.to_string()))?;

        let entry = &self.releasability[index];
        if entry.has_releases() {
            return Err(DomainError::AlreadyReleased {
                name: name.to_string(),
                count: entry.instances.len(),
            });
        }

        Ok(self.releasability.remove(index))
    }

    /// Remove one recorded release (identified by date)
    pub fn remove_release_instance(
        &mut self,
        name: &str,
        date: u64,
    ) -> Result<ReleaseInstance, DomainError> {
        let entry = self
            .releasability
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| DomainError::ReleasabilityNotFound(name.to_string()))?;

        let index = entry
            .instances
            .iter()
            .position(|i| i.date == date)
            .ok_or_else(|| DomainError::ReleaseInstanceNotFound {
                name: name.to_string(),
                date,
            })?;

        Ok(entry.instances.remove(index))
    }

    // ----------------------------------------------------------------------
    // Relationships
    // ----------------------------------------------------------------------

    /// Find the edge a key refers to
    pub fn find_relationship(&self, key: &EdgeKey) -> Option<&RelationshipEdge> {
        self.relationships.iter().find(|e| e.matches(key))
    }

    /// Append an edge unless an edge with the identical key exists
    ///
    /// Returns whether the edge was added.
    pub fn insert_relationship(&mut self, edge: RelationshipEdge) -> bool {
        let key = edge.key();
        if self.relationships.iter().any(|e| e.key() == key) {
            return false;
        }
        self.relationships.push(edge);
        true
    }

    /// Apply a change to the edge a key refers to
    pub fn update_relationship<F>(&mut self, key: &EdgeKey, change: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut RelationshipEdge),
    {
        let edge = self
            .relationships
            .iter_mut()
            .find(|e| e.matches(key))
            .ok_or_else(|| DomainError::EdgeNotFound(key.to_string()))?;
        change(edge);
        Ok(())
    }

    /// Remove the edge a key refers to
    pub fn remove_relationship(&mut self, key: &EdgeKey) -> Result<RelationshipEdge, DomainError> {
        let index = self
            .relationships
            .iter()
            .position(|e| e.matches(key))
            .ok_or_else(|| DomainError::EdgeNotFound(key.to_string()))?;
        Ok(self.relationships.remove(index))
    }

    /// Remove every edge pointing at one TLO, returning how many were removed
    pub fn remove_relationships_to(&mut self, kind: TloKind, id: TloId) -> usize {
        let before = self.relationships.len();
        self.relationships
            .retain(|e| !(e.target_kind == kind && e.target_id == id));
        before - self.relationships.len()
    }

    /// Keep only the edges the predicate accepts
    pub fn retain_relationships<F>(&mut self, keep: F)
    where
        F: FnMut(&RelationshipEdge) -> bool,
    {
        self.relationships.retain(keep);
    }

    // ----------------------------------------------------------------------
    // Families
    // ----------------------------------------------------------------------

    /// Family name when this TLO is a versioned variant of a family record
    pub fn family_name(&self) -> Option<&str> {
        if !self.kind.has_family() {
            return None;
        }
        let version = self.attribute_str(VERSION_ATTRIBUTE).unwrap_or("");
        if version.is_empty() {
            return None;
        }
        self.name().filter(|name| !name.is_empty())
    }

    /// Whether this TLO is the unversioned family record of its name
    pub fn is_family_record(&self) -> bool {
        self.kind.has_family() && self.attribute_str(VERSION_ATTRIBUTE).unwrap_or("").is_empty()
    }

    /// Whether `other` is the family record this variant belongs to
    pub fn is_variant_of(&self, other: &Tlo) -> bool {
        match self.family_name() {
            Some(family) => {
                other.kind == self.kind && other.is_family_record() && other.name() == Some(family)
            }
            None => false,
        }
    }

    // ----------------------------------------------------------------------
    // Sanitization
    // ----------------------------------------------------------------------

    /// View restricted to the given source names
    ///
    /// Source and releasability entries outside `allowed` are dropped; when
    /// any source was dropped a placeholder entry counting them is appended.
    /// The view is flagged as sanitized and can never be saved. Relationship
    /// filtering needs store lookups and is left to the caller.
    pub fn sanitized_view(&self, allowed: &BTreeSet<String>) -> Tlo {
        let mut view = self.clone();

        let before = view.source.len();
        view.source.retain(|s| allowed.contains(&s.name));
        let hidden = before - view.source.len();
        if hidden > 0 {
            view.source.push(SourceEntry::hidden(hidden));
        }

        view.releasability.retain(|r| allowed.contains(&r.name));
        view.sanitized = true;
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Confidence, RelationshipType};

    fn tlo_with_sources(names: &[&str]) -> Tlo {
        let mut tlo = Tlo::new(TloKind::Ip);
        for (i, name) in names.iter().enumerate() {
            tlo.add_source(SourceEntry::new(
                *name,
                SourceInstance::new("alice", 100 + i as u64, Tlp::Amber),
            ))
            .unwrap();
        }
        tlo
    }

    fn edge_to(target: TloId, relationship: RelationshipType) -> RelationshipEdge {
        RelationshipEdge {
            target_id: target,
            target_kind: TloKind::Domain,
            relationship,
            relationship_date: None,
            analyst: "alice".to_string(),
            confidence: Confidence::Medium,
            reason: String::new(),
            created: 10,
        }
    }

    #[test]
    fn test_add_source_merges_by_name() {
        let mut tlo = tlo_with_sources(&["TSRC"]);
        let added = tlo
            .add_source(SourceEntry::new("TSRC", SourceInstance::new("bob", 500, Tlp::Red)))
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(tlo.sources().len(), 1);
        assert_eq!(tlo.sources()[0].instances.len(), 2);

        // Identical report is not duplicated
        let added = tlo
            .add_source(SourceEntry::new("TSRC", SourceInstance::new("bob", 500, Tlp::Red)))
            .unwrap();
        assert_eq!(added, 0);
    }

    #[test]
    fn test_add_source_rejects_empty() {
        let mut tlo = Tlo::new(TloKind::Ip);
        let err = tlo
            .add_source(SourceEntry::new("  ", SourceInstance::new("a", 1, Tlp::Red)))
            .unwrap_err();
        assert_eq!(err, DomainError::EmptySourceName);

        let empty = SourceEntry {
            name: "TSRC".to_string(),
            instances: Vec::new(),
        };
        assert!(matches!(tlo.add_source(empty), Err(DomainError::EmptySource(_))));
    }

    #[test]
    fn test_remove_last_source_is_refused() {
        let mut tlo = tlo_with_sources(&["TSRC"]);
        let before = tlo.clone();

        assert_eq!(tlo.remove_source("TSRC"), Err(DomainError::LastSource));
        assert_eq!(
            tlo.remove_source_instance("TSRC", 100),
            Err(DomainError::LastSource)
        );
        assert_eq!(tlo, before);
    }

    #[test]
    fn test_remove_source_and_instance() {
        let mut tlo = tlo_with_sources(&["TSRC", "OTHERSRC"]);
        tlo.add_source_instance("TSRC", SourceInstance::new("bob", 900, Tlp::Red))
            .unwrap();

        let removed = tlo.remove_source_instance("TSRC", 900).unwrap();
        assert_eq!(removed.analyst, "bob");
        assert_eq!(tlo.sources().len(), 2);

        // Removing the sole instance drops the entry
        tlo.remove_source_instance("TSRC", 100).unwrap();
        assert_eq!(tlo.sources().len(), 1);
        assert!(!tlo.has_source("TSRC"));

        assert!(matches!(
            tlo.remove_source("MISSING"),
            Err(DomainError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_acceptable_tlp_levels() {
        let mut tlo = Tlo::new(TloKind::Ip);
        tlo.add_source_instance("A", SourceInstance::new("a", 1, Tlp::Red)).unwrap();
        assert_eq!(tlo.acceptable_tlp_levels(), vec![Tlp::Red]);

        tlo.add_source_instance("B", SourceInstance::new("b", 2, Tlp::White)).unwrap();
        assert_eq!(tlo.acceptable_tlp_levels(), Tlp::ALL.to_vec());

        assert!(Tlo::new(TloKind::Ip).acceptable_tlp_levels().is_empty());
    }

    #[test]
    fn test_set_tlp_is_constrained() {
        let mut tlo = Tlo::new(TloKind::Ip);
        tlo.add_source_instance("A", SourceInstance::new("a", 1, Tlp::Amber)).unwrap();

        assert!(matches!(
            tlo.set_tlp(Tlp::Green),
            Err(DomainError::TlpNotAcceptable { .. })
        ));
        tlo.set_tlp(Tlp::Red).unwrap();
        assert_eq!(tlo.tlp(), Some(Tlp::Red));
    }

    #[test]
    fn test_releasability_removal_requires_no_releases() {
        let mut tlo = tlo_with_sources(&["TSRC"]);
        assert!(tlo.add_releasability(ReleasabilityEntry::new("PARTNER", "alice")));
        assert!(!tlo.add_releasability(ReleasabilityEntry::new("PARTNER", "bob")));

        assert!(tlo
            .add_release_instance("PARTNER", ReleaseInstance::new(50, "shared at meeting"))
            .unwrap());
        assert!(!tlo
            .add_release_instance("PARTNER", ReleaseInstance::new(50, "again"))
            .unwrap());

        assert!(matches!(
            tlo.remove_releasability("PARTNER"),
            Err(DomainError::AlreadyReleased { count: 1, .. })
        ));

        tlo.remove_release_instance("PARTNER", 50).unwrap();
        tlo.remove_releasability("PARTNER").unwrap();
        assert!(tlo.releasability().is_empty());
    }

    #[test]
    fn test_relationship_edits() {
        let mut tlo = tlo_with_sources(&["TSRC"]);
        let target = TloId::new();

        assert!(tlo.insert_relationship(edge_to(target, RelationshipType::ResolvedTo)));
        assert!(!tlo.insert_relationship(edge_to(target, RelationshipType::ResolvedTo)));

        let key = EdgeKey::new(TloKind::Domain, target, RelationshipType::ResolvedTo, None);
        tlo.update_relationship(&key, |e| e.confidence = Confidence::High).unwrap();
        assert_eq!(tlo.find_relationship(&key).unwrap().confidence, Confidence::High);

        tlo.remove_relationship(&key).unwrap();
        assert!(tlo.relationships().is_empty());
        assert!(matches!(
            tlo.remove_relationship(&key),
            Err(DomainError::EdgeNotFound(_))
        ));
    }

    #[test]
    fn test_document_roundtrip_keeps_attributes() {
        let mut tlo = tlo_with_sources(&["TSRC"]);
        tlo.set_attribute("ip", Value::String("10.0.0.1".to_string())).unwrap();
        tlo.set_attribute("legacy_field", serde_json::json!({"nested": true})).unwrap();
        tlo.mark_saved(1234);

        let doc = tlo.to_document().unwrap();
        assert_eq!(doc["_id"], Value::String(tlo.id().to_string()));
        assert_eq!(doc["ip"], Value::String("10.0.0.1".to_string()));
        assert!(!doc.contains_key("sanitized"));

        let back = Tlo::from_document(TloKind::Ip, doc).unwrap();
        assert_eq!(back, tlo);
        assert_eq!(back.schema_version(), TloKind::Ip.latest_schema_version());
    }

    #[test]
    fn test_sanitized_marker_survives_document_roundtrip() {
        let tlo = tlo_with_sources(&["TSRC"]);
        let allowed: BTreeSet<String> = ["TSRC".to_string()].into_iter().collect();

        let doc = tlo.sanitized_view(&allowed).to_document().unwrap();
        assert_eq!(doc["sanitized"], Value::Bool(true));

        let back = Tlo::from_document(TloKind::Ip, doc).unwrap();
        assert!(back.is_sanitized());
    }

    #[test]
    fn test_reserved_attributes_are_refused() {
        let mut tlo = Tlo::new(TloKind::Ip);
        assert!(matches!(
            tlo.set_attribute("source", Value::Null),
            Err(DomainError::ReservedField(_))
        ));
    }

    #[test]
    fn test_mark_saved_stamps_once() {
        let mut tlo = Tlo::new(TloKind::Indicator);
        tlo.mark_saved(100);
        assert_eq!(tlo.schema_version(), 4);
        assert_eq!(tlo.created(), 100);

        tlo.mark_saved(200);
        assert_eq!(tlo.created(), 100);
        assert_eq!(tlo.modified(), 200);
    }

    #[test]
    fn test_family_detection() {
        let mut family = Tlo::new(TloKind::Backdoor);
        family.set_attribute(NAME_ATTRIBUTE, Value::from("Zeus")).unwrap();

        let mut variant = Tlo::new(TloKind::Backdoor);
        variant.set_attribute(NAME_ATTRIBUTE, Value::from("Zeus")).unwrap();
        variant.set_attribute(VERSION_ATTRIBUTE, Value::from("v2")).unwrap();

        assert!(family.is_family_record());
        assert_eq!(family.family_name(), None);
        assert_eq!(variant.family_name(), Some("Zeus"));
        assert!(variant.is_variant_of(&family));
        assert!(!family.is_variant_of(&variant));

        let mut sample = Tlo::new(TloKind::Sample);
        sample.set_attribute(VERSION_ATTRIBUTE, Value::from("1")).unwrap();
        assert_eq!(sample.family_name(), None);
    }

    #[test]
    fn test_sanitized_view_hides_sources() {
        let mut tlo = tlo_with_sources(&["TSRC", "TUNKSRC"]);
        tlo.add_releasability(ReleasabilityEntry::new("TSRC", "alice"));
        tlo.add_releasability(ReleasabilityEntry::new("TUNKSRC", "alice"));

        let allowed: BTreeSet<String> = ["TSRC".to_string()].into_iter().collect();
        let view = tlo.sanitized_view(&allowed);

        assert!(view.is_sanitized());
        assert!(!tlo.is_sanitized());
        assert_eq!(view.sources().len(), 2);
        assert_eq!(view.sources()[0].name, "TSRC");
        assert!(view.sources()[1].is_hidden_marker());
        assert_eq!(view.sources()[1].instances.len(), 1);
        assert_eq!(view.releasability().len(), 1);

        // The canonical copy is untouched
        assert_eq!(tlo.sources().len(), 2);
        assert_eq!(tlo.sources()[1].name, "TUNKSRC");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_instance() -> impl Strategy<Value = SourceInstance> {
        (
            prop::sample::select(vec!["alice", "bob"]),
            0u64..5,
            prop::sample::select(Tlp::ALL.to_vec()),
        )
            .prop_map(|(analyst, date, tlp)| SourceInstance::new(analyst, date, tlp))
    }

    proptest! {
        /// Adding the same source entry twice never grows the instance list
        #[test]
        fn test_add_source_idempotent(instances in prop::collection::vec(any_instance(), 1..8)) {
            let entry = SourceEntry { name: "TSRC".to_string(), instances };
            let mut tlo = Tlo::new(TloKind::Ip);
            tlo.add_source(entry.clone()).unwrap();
            let once = tlo.clone();

            prop_assert_eq!(tlo.add_source(entry).unwrap(), 0);
            prop_assert_eq!(tlo, once);
        }

        /// Sanitized views only expose allowed names plus the placeholder
        #[test]
        fn test_sanitized_view_only_allowed(
            names in prop::collection::btree_set("[A-D]", 1..4),
            allowed in prop::collection::btree_set("[A-D]", 0..4),
        ) {
            let mut tlo = Tlo::new(TloKind::Ip);
            for name in &names {
                tlo.add_source_instance(name.clone(), SourceInstance::new("a", 1, Tlp::Red)).unwrap();
            }

            let view = tlo.sanitized_view(&allowed);
            let hidden = names.iter().filter(|n| !allowed.contains(*n)).count();
            for entry in view.sources() {
                prop_assert!(allowed.contains(&entry.name) || entry.is_hidden_marker());
            }
            if hidden > 0 {
                let marker = view.sources().last().unwrap();
                prop_assert!(marker.is_hidden_marker());
                prop_assert_eq!(marker.instances.len(), hidden);
            }
        }
    }
}
