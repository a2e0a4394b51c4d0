//! Save-time TLO validation

use crate::ValidationConfig;
use provenant_domain::{EdgeKey, Tlo, Tlp};
use std::collections::HashSet;
use std::fmt;

/// Result of TLO validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the TLO passed validation
    pub status: ValidationStatus,

    /// Rejection reasons (if any)
    pub reasons: Vec<RejectionReason>,
}

impl ValidationResult {
    /// Whether the TLO may be saved
    pub fn is_accepted(&self) -> bool {
        self.status == ValidationStatus::Accepted
    }
}

/// Validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// TLO accepted
    Accepted,

    /// TLO rejected
    Rejected,
}

/// Reasons for rejection
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// The TLO has no source entries
    NoSources,

    /// The TLO is a sanitized view
    SanitizedView,

    /// The TLO carries the hidden-source placeholder
    HiddenSourcePlaceholder,

    /// A source entry has an empty name
    EmptySourceName,

    /// A source entry has no instances
    EmptySource(String),

    /// Two source entries share a name
    DuplicateSourceName(String),

    /// An edge points back at its owner
    SelfRelationship,

    /// Two edges share target, label and date
    DuplicateRelationship(String),

    /// Stored schema version is newer than this build supports
    SchemaAheadOfSoftware {
        /// Version carried by the TLO
        version: u32,
        /// Latest version known for the kind
        latest: u32,
    },

    /// The TLO-level TLP is not permitted by the sources
    TlpNotAcceptable {
        /// TLP set on the TLO
        tlp: Tlp,
        /// Levels the sources permit
        allowed: Vec<Tlp>,
    },

    /// No TLO-level TLP set
    MissingTlp,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NoSources => write!(f, "at least one source is required"),
            RejectionReason::SanitizedView => write!(f, "sanitized views cannot be saved"),
            RejectionReason::HiddenSourcePlaceholder => {
                write!(f, "hidden-source placeholder cannot be saved")
            }
            RejectionReason::EmptySourceName => write!(f, "source name is empty"),
            RejectionReason::EmptySource(name) => write!(f, "source '{}' has no instances", name),
            RejectionReason::DuplicateSourceName(name) => {
                write!(f, "source '{}' appears more than once", name)
            }
            RejectionReason::SelfRelationship => write!(f, "relationship to itself"),
            RejectionReason::DuplicateRelationship(key) => {
                write!(f, "duplicate relationship {}", key)
            }
            RejectionReason::SchemaAheadOfSoftware { version, latest } => write!(
                f,
                "schema version {} is newer than supported {}",
                version, latest
            ),
            RejectionReason::TlpNotAcceptable { tlp, allowed } => {
                write!(f, "TLP '{}' not acceptable (allowed: {:?})", tlp, allowed)
            }
            RejectionReason::MissingTlp => write!(f, "TLP is required"),
        }
    }
}

/// The Gatekeeper validates TLOs before storage
#[derive(Debug, Clone, Default)]
pub struct Gatekeeper {
    config: ValidationConfig,
}

impl Gatekeeper {
    /// Create a new Gatekeeper with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a TLO against the configured rules
    ///
    /// Every failing rule is reported, not only the first.
    pub fn validate(&self, tlo: &Tlo) -> ValidationResult {
        let mut reasons = Vec::new();

        // 1. Mandatory rules
        if tlo.is_sanitized() {
            reasons.push(RejectionReason::SanitizedView);
        }
        if tlo.sources().iter().any(|s| s.is_hidden_marker()) {
            reasons.push(RejectionReason::HiddenSourcePlaceholder);
        }
        if tlo.sources().is_empty() {
            reasons.push(RejectionReason::NoSources);
        }

        // 2. Source entries
        if self.config.validate_source_names {
            self.check_sources(tlo, &mut reasons);
        }

        // 3. Relationship edges
        if self.config.validate_relationships {
            self.check_relationships(tlo, &mut reasons);
        }

        // 4. Schema version
        if self.config.validate_schema_version {
            let latest = tlo.kind().latest_schema_version();
            if tlo.schema_version() > latest {
                reasons.push(RejectionReason::SchemaAheadOfSoftware {
                    version: tlo.schema_version(),
                    latest,
                });
            }
        }

        // 5. TLP
        match tlo.tlp() {
            Some(tlp) if self.config.validate_tlp => {
                let allowed = tlo.acceptable_tlp_levels();
                if !allowed.contains(&tlp) {
                    reasons.push(RejectionReason::TlpNotAcceptable { tlp, allowed });
                }
            }
            None if self.config.require_tlp => reasons.push(RejectionReason::MissingTlp),
            _ => {}
        }

        let status = if reasons.is_empty() {
            ValidationStatus::Accepted
        } else {
            ValidationStatus::Rejected
        };

        ValidationResult { status, reasons }
    }

    fn check_sources(&self, tlo: &Tlo, reasons: &mut Vec<RejectionReason>) {
        let mut seen = HashSet::new();
        for entry in tlo.sources() {
            if entry.is_hidden_marker() {
                continue;
            }
            if entry.name.trim().is_empty() {
                reasons.push(RejectionReason::EmptySourceName);
            } else if entry.instances.is_empty() {
                reasons.push(RejectionReason::EmptySource(entry.name.clone()));
            }
            if !seen.insert(entry.name.as_str()) {
                reasons.push(RejectionReason::DuplicateSourceName(entry.name.clone()));
            }
        }
    }

    fn check_relationships(&self, tlo: &Tlo, reasons: &mut Vec<RejectionReason>) {
        let mut seen: HashSet<EdgeKey> = HashSet::new();
        for edge in tlo.relationships() {
            if edge.target_id == tlo.id() && edge.target_kind == tlo.kind() {
                reasons.push(RejectionReason::SelfRelationship);
            }
            let key = edge.key();
            if !seen.insert(key) {
                reasons.push(RejectionReason::DuplicateRelationship(key.to_string()));
            }
        }
    }
}
