//! Releasability: who a TLO may additionally be shared with

use serde::{Deserialize, Serialize};

/// A recorded release of a TLO to a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInstance {
    /// When the release happened (Unix seconds)
    pub date: u64,

    /// Free-form note
    #[serde(default)]
    pub note: String,
}

impl ReleaseInstance {
    /// Create a release instance
    pub fn new(date: u64, note: impl Into<String>) -> Self {
        Self {
            date,
            note: note.into(),
        }
    }
}

/// Permission to share a TLO with a source, independent of provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasabilityEntry {
    /// Source the TLO may be released to
    pub name: String,

    /// Analyst who granted releasability
    pub analyst: String,

    /// Releases that already happened
    #[serde(default)]
    pub instances: Vec<ReleaseInstance>,
}

impl ReleasabilityEntry {
    /// Create a releasability entry with no releases yet
    pub fn new(name: impl Into<String>, analyst: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyst: analyst.into(),
            instances: Vec::new(),
        }
    }

    /// Whether anything has been released under this entry
    pub fn has_releases(&self) -> bool {
        !self.instances.is_empty()
    }
}
