//! TLO identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a top-level object, based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, which the store relies
/// on for stable iteration order during batch sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TloId(uuid::Uuid);

impl TloId {
    /// Generate a new UUIDv7-based TloId
    ///
    /// # Examples
    ///
    /// ```
    /// use provenant_domain::TloId;
    ///
    /// let id = TloId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create a TloId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(uuid::Uuid::from_u128(value))
    }

    /// Parse a TloId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use provenant_domain::TloId;
    ///
    /// let id = TloId::new();
    /// let parsed = TloId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid TLO id '{}': {}", s, e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0.as_u128()
    }

    /// Milliseconds since the Unix epoch encoded in the UUIDv7 prefix
    pub fn timestamp(&self) -> u64 {
        (self.value() >> 80) as u64
    }
}

impl Default for TloId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TloId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        let id1 = TloId::from_value(1000);
        let id2 = TloId::from_value(2000);

        assert!(id1 < id2);
    }

    #[test]
    fn test_id_chronological() {
        let id1 = TloId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = TloId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should sort first");
        assert!(id1.timestamp() <= id2.timestamp());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = TloId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));

        let back: TloId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_invalid_string() {
        assert!(TloId::from_string("not-a-valid-uuid").is_err());
        assert!(TloId::from_string("").is_err());
    }
}
