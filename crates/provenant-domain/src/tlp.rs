//! Traffic Light Protocol levels

use serde::{Deserialize, Serialize};
use std::fmt;

/// TLP sharing classification
///
/// Ordered from most shareable to least shareable:
/// - White: unlimited disclosure
/// - Green: community-wide
/// - Amber: limited to participating organizations
/// - Red: named recipients only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tlp {
    /// Unlimited disclosure
    White,
    /// Community-wide disclosure
    Green,
    /// Limited disclosure
    Amber,
    /// Named recipients only
    Red,
}

impl Tlp {
    /// Every level, most permissive first
    pub const ALL: [Tlp; 4] = [Tlp::White, Tlp::Green, Tlp::Amber, Tlp::Red];

    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Tlp::White => "white",
            Tlp::Green => "green",
            Tlp::Amber => "amber",
            Tlp::Red => "red",
        }
    }

    /// Parse a level from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "white" => Some(Tlp::White),
            "green" => Some(Tlp::Green),
            "amber" => Some(Tlp::Amber),
            "red" => Some(Tlp::Red),
            _ => None,
        }
    }

    /// The next more restrictive level
    pub fn stricter(&self) -> Option<Self> {
        match self {
            Tlp::White => Some(Tlp::Green),
            Tlp::Green => Some(Tlp::Amber),
            Tlp::Amber => Some(Tlp::Red),
            Tlp::Red => None,
        }
    }

    /// Levels visible from this one: itself and everything stricter
    ///
    /// # Examples
    ///
    /// ```
    /// use provenant_domain::Tlp;
    ///
    /// assert_eq!(Tlp::Amber.cascade(), vec![Tlp::Amber, Tlp::Red]);
    /// assert_eq!(Tlp::White.cascade().len(), 4);
    /// ```
    pub fn cascade(&self) -> Vec<Tlp> {
        Tlp::ALL.iter().copied().filter(|level| level >= self).collect()
    }

    /// Whether `self` is at least as shareable as `other`
    pub fn permits(&self, other: Tlp) -> bool {
        *self <= other
    }
}

impl fmt::Display for Tlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tlp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid TLP level: {}", s))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_tlp() -> impl Strategy<Value = Tlp> {
        prop::sample::select(Tlp::ALL.to_vec())
    }

    proptest! {
        /// A more permissive level's cascade is a superset of a stricter one's
        #[test]
        fn test_cascade_monotonic(a in any_tlp(), b in any_tlp()) {
            let (open, strict) = if a <= b { (a, b) } else { (b, a) };
            let open_set = open.cascade();
            for level in strict.cascade() {
                prop_assert!(open_set.contains(&level));
            }
        }
    }
}
