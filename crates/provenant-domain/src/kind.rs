//! Registry of top-level object kinds
//!
//! Every kind resolves through a single static descriptor table, so there is
//! no import-order or runtime registration involved in finding out how a kind
//! behaves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of top-level object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TloKind {
    /// Threat actor
    Actor,
    /// Malware family or variant
    Backdoor,
    /// Named campaign (not source-scoped)
    Campaign,
    /// X.509 certificate
    Certificate,
    /// Domain name
    Domain,
    /// Email message
    Email,
    /// Reported event
    Event,
    /// Exploit
    Exploit,
    /// Indicator of compromise
    Indicator,
    /// IP address
    #[serde(rename = "IP")]
    Ip,
    /// Packet capture
    #[serde(rename = "PCAP")]
    Pcap,
    /// Raw text data
    RawData,
    /// File sample
    Sample,
    /// Screenshot
    Screenshot,
    /// Detection signature
    Signature,
    /// Targeted person or organization (not source-scoped)
    Target,
}

/// Static behaviour of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Stored name of the kind
    pub name: &'static str,

    /// Latest schema version documents of this kind migrate to
    pub latest_schema_version: u32,

    /// Whether visibility of this kind is governed by its sources
    pub source_scoped: bool,

    /// Whether records can be versioned variants of a family record
    pub has_family: bool,
}

const fn descriptor(name: &'static str, latest: u32) -> KindDescriptor {
    KindDescriptor {
        name,
        latest_schema_version: latest,
        source_scoped: true,
        has_family: false,
    }
}

static DESCRIPTORS: [KindDescriptor; 16] = [
    descriptor("Actor", 3),
    KindDescriptor {
        has_family: true,
        ..descriptor("Backdoor", 3)
    },
    KindDescriptor {
        source_scoped: false,
        ..descriptor("Campaign", 3)
    },
    descriptor("Certificate", 3),
    descriptor("Domain", 3),
    descriptor("Email", 3),
    descriptor("Event", 3),
    descriptor("Exploit", 3),
    descriptor("Indicator", 4),
    descriptor("IP", 3),
    descriptor("PCAP", 3),
    descriptor("RawData", 3),
    descriptor("Sample", 3),
    descriptor("Screenshot", 3),
    descriptor("Signature", 3),
    KindDescriptor {
        source_scoped: false,
        ..descriptor("Target", 3)
    },
];

impl TloKind {
    /// All kinds, in descriptor order
    pub const ALL: [TloKind; 16] = [
        TloKind::Actor,
        TloKind::Backdoor,
        TloKind::Campaign,
        TloKind::Certificate,
        TloKind::Domain,
        TloKind::Email,
        TloKind::Event,
        TloKind::Exploit,
        TloKind::Indicator,
        TloKind::Ip,
        TloKind::Pcap,
        TloKind::RawData,
        TloKind::Sample,
        TloKind::Screenshot,
        TloKind::Signature,
        TloKind::Target,
    ];

    /// Descriptor for this kind
    pub fn descriptor(&self) -> &'static KindDescriptor {
        &DESCRIPTORS[*self as usize]
    }

    /// Get the kind name as stored
    pub fn as_str(&self) -> &'static str {
        self.descriptor().name
    }

    /// Latest schema version for this kind
    pub fn latest_schema_version(&self) -> u32 {
        self.descriptor().latest_schema_version
    }

    /// Whether access to objects of this kind is filtered by source
    pub fn is_source_scoped(&self) -> bool {
        self.descriptor().source_scoped
    }

    /// Whether this kind has versioned variants grouped under a family record
    pub fn has_family(&self) -> bool {
        self.descriptor().has_family
    }

    /// Parse a kind from its stored name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for TloKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TloKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid TLO kind: {}", s))
    }
}
