//! Identifiers: who a clanmate is and what a clan is called

use crate::{ClanError, ClanResult};
use serde::{Deserialize, Serialize};

/// Unique identifier for a player that can belong to a clan
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The immutable name of a clan
///
/// A valid name is non-empty and made only of ASCII letters, digits,
/// `-` and `_`. The only way to obtain a `ClanName` is through
/// [`ClanName::parse`] (or deserialization, which calls it).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClanName(String);

impl ClanName {
    /// Validate and wrap a clan name
    pub fn parse(name: impl Into<String>) -> ClanResult<Self> {
        let name = name.into();
        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(ClanError::InvalidClanName(name))
        }
    }

    /// Check a candidate name without allocating a `ClanName`
    pub fn is_valid(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClanName {
    type Error = ClanError;

    fn try_from(value: String) -> ClanResult<Self> {
        Self::parse(value)
    }
}

impl From<ClanName> for String {
    fn from(name: ClanName) -> Self {
        name.0
    }
}

impl std::fmt::Display for ClanName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id() {
        let id = MemberId::generate();
        assert!(!id.0.is_empty());
        let named = MemberId::new("steve");
        assert_eq!(format!("{}", named), "steve");
    }

    #[test]
    fn test_valid_clan_names() {
        for name in ["Alpha", "beta_2", "the-clan", "X", "0_-"] {
            assert!(ClanName::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_clan_names() {
        for name in ["", "two words", "dots.not.allowed", "émile", "semi;colon"] {
            let err = ClanName::parse(name).unwrap_err();
            assert!(matches!(err, ClanError::InvalidClanName(ref n) if n == name));
        }
    }

    #[test]
    fn test_clan_name_deserialization_validates() {
        let ok: ClanName = serde_json::from_str("\"Alpha\"").unwrap();
        assert_eq!(ok.as_str(), "Alpha");

        let bad: Result<ClanName, _> = serde_json::from_str("\"no spaces\"");
        assert!(bad.is_err());
    }
}
