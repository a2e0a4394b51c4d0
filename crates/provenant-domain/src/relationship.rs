//! Relationship types and denormalized edges
//!
//! Every edge is stored twice: once on each endpoint, the second copy carrying
//! the inverse label. The type table below is the single source of truth for
//! which label mirrors which.

use crate::{Confidence, TloId, TloKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of relationship between two TLOs, read from the owning side
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RelationshipType {
    /// Owner is a compressed form of the target
    CompressedFrom,
    /// Owner was compressed into the target
    CompressedInto,
    /// Owner received a connection from the target
    ConnectedFrom,
    /// Owner connected to the target
    ConnectedTo,
    /// Owner contains the target
    Contains,
    /// Owner is contained within the target
    ContainedWithin,
    /// Owner created the target
    Created,
    /// Owner was created by the target
    CreatedBy,
    /// Owner decoded the target
    Decoded,
    /// Owner was decoded by the target
    DecodedBy,
    /// Owner decrypted the target
    Decrypted,
    /// Owner was decrypted by the target
    DecryptedBy,
    /// Owner downloaded the target
    Downloaded,
    /// Owner was downloaded by the target
    DownloadedBy,
    /// Owner was downloaded from the target
    DownloadedFrom,
    /// Owner was downloaded to the target
    DownloadedTo,
    /// Owner dropped the target
    Dropped,
    /// Owner was dropped by the target
    DroppedBy,
    /// Owner installed the target
    Installed,
    /// Owner was installed by the target
    InstalledBy,
    /// Owner was loaded from the target
    LoadedFrom,
    /// Owner was loaded into the target
    LoadedInto,
    /// Owner was packed from the target
    PackedFrom,
    /// Owner was packed into the target
    PackedInto,
    /// Owner is the parent of the target
    ParentOf,
    /// Owner is a child of the target
    ChildOf,
    /// Owner was received from the target
    ReceivedFrom,
    /// Owner was sent to the target
    SentTo,
    /// Owner registered the target
    Registered,
    /// Owner is registered to the target
    RegisteredTo,
    /// Generic association (symmetric)
    RelatedTo,
    /// Owner resolves to the target (symmetric)
    ResolvedTo,
    /// Owner is a sub-domain of the target
    SubDomainOf,
    /// Owner is a parent domain of the target
    SupraDomainOf,
    /// Owner was uploaded from the target
    UploadedFrom,
    /// Owner was uploaded to the target
    UploadedTo,
    /// Owner wraps the target
    Wrapped,
    /// Owner is wrapped by the target
    WrappedBy,
}

impl RelationshipType {
    /// Every relationship type
    pub const ALL: [RelationshipType; 38] = [
        RelationshipType::CompressedFrom,
        RelationshipType::CompressedInto,
        RelationshipType::ConnectedFrom,
        RelationshipType::ConnectedTo,
        RelationshipType::Contains,
        RelationshipType::ContainedWithin,
        RelationshipType::Created,
        RelationshipType::CreatedBy,
        RelationshipType::Decoded,
        RelationshipType::DecodedBy,
        RelationshipType::Decrypted,
        RelationshipType::DecryptedBy,
        RelationshipType::Downloaded,
        RelationshipType::DownloadedBy,
        RelationshipType::DownloadedFrom,
        RelationshipType::DownloadedTo,
        RelationshipType::Dropped,
        RelationshipType::DroppedBy,
        RelationshipType::Installed,
        RelationshipType::InstalledBy,
        RelationshipType::LoadedFrom,
        RelationshipType::LoadedInto,
        RelationshipType::PackedFrom,
        RelationshipType::PackedInto,
        RelationshipType::ParentOf,
        RelationshipType::ChildOf,
        RelationshipType::ReceivedFrom,
        RelationshipType::SentTo,
        RelationshipType::Registered,
        RelationshipType::RegisteredTo,
        RelationshipType::RelatedTo,
        RelationshipType::ResolvedTo,
        RelationshipType::SubDomainOf,
        RelationshipType::SupraDomainOf,
        RelationshipType::UploadedFrom,
        RelationshipType::UploadedTo,
        RelationshipType::Wrapped,
        RelationshipType::WrappedBy,
    ];

    /// Stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::CompressedFrom => "Compressed_From",
            RelationshipType::CompressedInto => "Compressed_Into",
            RelationshipType::ConnectedFrom => "Connected_From",
            RelationshipType::ConnectedTo => "Connected_To",
            RelationshipType::Contains => "Contains",
            RelationshipType::ContainedWithin => "Contained_Within",
            RelationshipType::Created => "Created",
            RelationshipType::CreatedBy => "Created_By",
            RelationshipType::Decoded => "Decoded",
            RelationshipType::DecodedBy => "Decoded_By",
            RelationshipType::Decrypted => "Decrypted",
            RelationshipType::DecryptedBy => "Decrypted_By",
            RelationshipType::Downloaded => "Downloaded",
            RelationshipType::DownloadedBy => "Downloaded_By",
            RelationshipType::DownloadedFrom => "Downloaded_From",
            RelationshipType::DownloadedTo => "Downloaded_To",
            RelationshipType::Dropped => "Dropped",
            RelationshipType::DroppedBy => "Dropped_By",
            RelationshipType::Installed => "Installed",
            RelationshipType::InstalledBy => "Installed_By",
            RelationshipType::LoadedFrom => "Loaded_From",
            RelationshipType::LoadedInto => "Loaded_Into",
            RelationshipType::PackedFrom => "Packed_From",
            RelationshipType::PackedInto => "Packed_Into",
            RelationshipType::ParentOf => "Parent_Of",
            RelationshipType::ChildOf => "Child_Of",
            RelationshipType::ReceivedFrom => "Received_From",
            RelationshipType::SentTo => "Sent_To",
            RelationshipType::Registered => "Registered",
            RelationshipType::RegisteredTo => "Registered_To",
            RelationshipType::RelatedTo => "Related_To",
            RelationshipType::ResolvedTo => "Resolved_To",
            RelationshipType::SubDomainOf => "Sub_Domain_Of",
            RelationshipType::SupraDomainOf => "Supra_Domain_Of",
            RelationshipType::UploadedFrom => "Uploaded_From",
            RelationshipType::UploadedTo => "Uploaded_To",
            RelationshipType::Wrapped => "Wrapped",
            RelationshipType::WrappedBy => "Wrapped_By",
        }
    }

    /// Label carried by the mirrored edge on the other endpoint
    ///
    /// # Examples
    ///
    /// ```
    /// use provenant_domain::RelationshipType;
    ///
    /// assert_eq!(RelationshipType::ParentOf.inverse(), RelationshipType::ChildOf);
    /// assert_eq!(RelationshipType::RelatedTo.inverse(), RelationshipType::RelatedTo);
    /// ```
    pub fn inverse(&self) -> Self {
        use RelationshipType::*;
        match self {
            CompressedFrom => CompressedInto,
            CompressedInto => CompressedFrom,
            ConnectedFrom => ConnectedTo,
            ConnectedTo => ConnectedFrom,
            Contains => ContainedWithin,
            ContainedWithin => Contains,
            Created => CreatedBy,
            CreatedBy => Created,
            Decoded => DecodedBy,
            DecodedBy => Decoded,
            Decrypted => DecryptedBy,
            DecryptedBy => Decrypted,
            Downloaded => DownloadedBy,
            DownloadedBy => Downloaded,
            DownloadedFrom => DownloadedTo,
            DownloadedTo => DownloadedFrom,
            Dropped => DroppedBy,
            DroppedBy => Dropped,
            Installed => InstalledBy,
            InstalledBy => Installed,
            LoadedFrom => LoadedInto,
            LoadedInto => LoadedFrom,
            PackedFrom => PackedInto,
            PackedInto => PackedFrom,
            ParentOf => ChildOf,
            ChildOf => ParentOf,
            ReceivedFrom => SentTo,
            SentTo => ReceivedFrom,
            Registered => RegisteredTo,
            RegisteredTo => Registered,
            RelatedTo => RelatedTo,
            ResolvedTo => ResolvedTo,
            SubDomainOf => SupraDomainOf,
            SupraDomainOf => SubDomainOf,
            UploadedFrom => UploadedTo,
            UploadedTo => UploadedFrom,
            Wrapped => WrappedBy,
            WrappedBy => Wrapped,
        }
    }

    /// Whether the type is its own inverse
    pub fn is_symmetric(&self) -> bool {
        self.inverse() == *self
    }

    /// Parse a label, accepting spaces for underscores and any letter case
    ///
    /// `"Related_To"`, `"Related To"` and `"related_to"` all parse to
    /// [`RelationshipType::RelatedTo`].
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().replace(' ', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(&normalized))
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown relationship type: {}", s))
    }
}

impl TryFrom<String> for RelationshipType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelationshipType> for String {
    fn from(value: RelationshipType) -> Self {
        value.as_str().to_string()
    }
}

/// One side of a denormalized relationship, stored on the owning TLO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Identifier of the related TLO
    pub target_id: TloId,

    /// Kind of the related TLO
    pub target_kind: TloKind,

    /// Label read from the owning side
    pub relationship: RelationshipType,

    /// When the real-world relationship applies (distinct from `created`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_date: Option<u64>,

    /// Analyst who asserted the relationship
    #[serde(default)]
    pub analyst: String,

    /// Analyst confidence
    #[serde(default)]
    pub confidence: Confidence,

    /// Free-text justification
    #[serde(default)]
    pub reason: String,

    /// When the edge was recorded (Unix seconds)
    #[serde(default)]
    pub created: u64,
}

impl RelationshipEdge {
    /// Key identifying this edge on its owner
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            target_id: self.target_id,
            target_kind: self.target_kind,
            relationship: self.relationship,
            relationship_date: self.relationship_date,
        }
    }

    /// Whether this edge is the one `key` refers to
    ///
    /// The relationship date only participates when the key carries one.
    pub fn matches(&self, key: &EdgeKey) -> bool {
        self.target_id == key.target_id
            && self.target_kind == key.target_kind
            && self.relationship == key.relationship
            && key
                .relationship_date
                .map_or(true, |date| self.relationship_date == Some(date))
    }

    /// The edge the other endpoint should carry, pointing back at `owner`
    ///
    /// Analyst, dates, confidence and reason are copied verbatim so that a
    /// repaired mirror is indistinguishable from one created together with
    /// this edge.
    pub fn mirror(&self, owner_kind: TloKind, owner_id: TloId) -> RelationshipEdge {
        RelationshipEdge {
            target_id: owner_id,
            target_kind: owner_kind,
            relationship: self.relationship.inverse(),
            ..self.clone()
        }
    }
}

/// Identifies an edge on its owner: target, label and optional date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    /// Identifier of the related TLO
    pub target_id: TloId,
    /// Kind of the related TLO
    pub target_kind: TloKind,
    /// Label read from the owning side
    pub relationship: RelationshipType,
    /// Relationship date, when the caller wants an exact match on it
    pub relationship_date: Option<u64>,
}

impl EdgeKey {
    /// Create an edge key
    pub fn new(
        target_kind: TloKind,
        target_id: TloId,
        relationship: RelationshipType,
        relationship_date: Option<u64>,
    ) -> Self {
        Self {
            target_id,
            target_kind,
            relationship,
            relationship_date,
        }
    }

    /// Key of the mirrored edge on the target, pointing back at `owner`
    pub fn mirror(&self, owner_kind: TloKind, owner_id: TloId) -> EdgeKey {
        EdgeKey {
            target_id: owner_id,
            target_kind: owner_kind,
            relationship: self.relationship.inverse(),
            relationship_date: self.relationship_date,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.relationship, self.target_kind, self.target_id)?;
        if let Some(date) = self.relationship_date {
            write!(f, " @{}", date)?;
        }
        Ok(())
    }
}
