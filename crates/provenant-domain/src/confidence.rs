//! Analyst confidence in a relationship

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence an analyst assigns to a relationship
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// No assessment made
    #[default]
    Unknown,
    /// Weak evidence
    Low,
    /// Reasonable evidence
    Medium,
    /// Strong evidence
    High,
}

impl Confidence {
    /// Get the confidence name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Unknown => "unknown",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }

    /// Parse a confidence from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unknown" | "" => Some(Confidence::Unknown),
            "low" => Some(Confidence::Low),
            "medium" => Some(Confidence::Medium),
            "high" => Some(Confidence::High),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid confidence: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(Confidence::default(), Confidence::Unknown);
    }

    #[test]
    fn test_parse_and_ordering() {
        assert_eq!(Confidence::parse("HIGH"), Some(Confidence::High));
        assert_eq!(Confidence::parse(""), Some(Confidence::Unknown));
        assert_eq!(Confidence::parse("certain"), None);
        assert!(Confidence::Low < Confidence::High);
    }
}
