//! Provenance tracking: who supplied a TLO and under what sharing constraint

use crate::Tlp;
use serde::{Deserialize, Serialize};

/// Name of the synthetic entry that stands in for hidden sources
pub const HIDDEN_SOURCE_NAME: &str = "Other";

/// A single report of a TLO by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInstance {
    /// Analyst who recorded the instance
    pub analyst: String,

    /// When the source reported it (Unix seconds)
    pub date: u64,

    /// How the data was obtained (e.g., "feed", "manual")
    #[serde(default)]
    pub method: String,

    /// External reference (report id, URL, ...)
    #[serde(default)]
    pub reference: String,

    /// Sharing constraint attached by the source
    pub tlp: Tlp,
}

impl SourceInstance {
    /// Create a new source instance
    pub fn new(analyst: impl Into<String>, date: u64, tlp: Tlp) -> Self {
        Self {
            analyst: analyst.into(),
            date,
            method: String::new(),
            reference: String::new(),
            tlp,
        }
    }

    /// Set the collection method
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the external reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    /// Two instances describe the same report when these fields agree; TLP
    /// is deliberately not part of the identity.
    pub fn same_report(&self, other: &SourceInstance) -> bool {
        self.analyst == other.analyst
            && self.date == other.date
            && self.method == other.method
            && self.reference == other.reference
    }
}

/// All reports of a TLO from one named source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Source identity, unique within a TLO
    pub name: String,

    /// Reports in the order they were recorded
    #[serde(default)]
    pub instances: Vec<SourceInstance>,
}

impl SourceEntry {
    /// Create a source entry with a single instance
    pub fn new(name: impl Into<String>, instance: SourceInstance) -> Self {
        Self {
            name: name.into(),
            instances: vec![instance],
        }
    }

    /// Placeholder entry counting sources hidden from the viewer
    ///
    /// The placeholder instances are blank and the entry can never be saved.
    pub fn hidden(count: usize) -> Self {
        Self {
            name: HIDDEN_SOURCE_NAME.to_string(),
            instances: vec![SourceInstance::new(String::new(), 0, Tlp::Red); count],
        }
    }

    /// Whether this is the placeholder produced by sanitization
    pub fn is_hidden_marker(&self) -> bool {
        self.name == HIDDEN_SOURCE_NAME
            && !self.instances.is_empty()
            && self
                .instances
                .iter()
                .all(|i| i.analyst.is_empty() && i.date == 0)
    }

    /// Merge instances from another entry, skipping reports already present
    ///
    /// Returns how many instances were added.
    pub fn merge(&mut self, incoming: SourceEntry) -> usize {
        let mut added = 0;
        for instance in incoming.instances {
            if !self.instances.iter().any(|i| i.same_report(&instance)) {
                self.instances.push(instance);
                added += 1;
            }
        }
        added
    }

    /// Most permissive TLP across this entry's instances
    pub fn most_permissive_tlp(&self) -> Option<Tlp> {
        self.instances.iter().map(|i| i.tlp).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_deduplicates_reports() {
        let mut entry = SourceEntry::new("TSRC", SourceInstance::new("alice", 100, Tlp::Amber));
        let incoming = SourceEntry {
            name: "TSRC".to_string(),
            instances: vec![
                SourceInstance::new("alice", 100, Tlp::Red),
                SourceInstance::new("bob", 200, Tlp::Green).with_reference("report-7"),
            ],
        };

        assert_eq!(entry.merge(incoming), 1);
        assert_eq!(entry.instances.len(), 2);
        // The original instance keeps its own TLP
        assert_eq!(entry.instances[0].tlp, Tlp::Amber);
    }

    #[test]
    fn test_most_permissive_tlp() {
        let mut entry = SourceEntry::new("TSRC", SourceInstance::new("alice", 100, Tlp::Red));
        entry.instances.push(SourceInstance::new("bob", 200, Tlp::Green));
        assert_eq!(entry.most_permissive_tlp(), Some(Tlp::Green));
    }

    #[test]
    fn test_hidden_marker() {
        let marker = SourceEntry::hidden(3);
        assert_eq!(marker.name, HIDDEN_SOURCE_NAME);
        assert_eq!(marker.instances.len(), 3);
        assert!(marker.is_hidden_marker());

        let real = SourceEntry::new("Other", SourceInstance::new("carol", 5, Tlp::White));
        assert!(!real.is_hidden_marker());
    }
}
