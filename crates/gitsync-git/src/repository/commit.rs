//! Commit identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RepoError;

/// A full, validated commit SHA.
///
/// Stored lowercased so ids coming from webhooks and from the object
/// database compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Length of a hex-encoded SHA-1 object id.
    pub const HEX_LEN: usize = 40;

    /// Parses a hex commit id.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::CommitNotFound` if the string is not a full
    /// 40-digit hex SHA.
    pub fn parse(sha: &str) -> Result<Self, RepoError> {
        let sha = sha.trim();

        if sha.len() != Self::HEX_LEN || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RepoError::CommitNotFound(sha.to_string()));
        }

        Ok(Self(sha.to_ascii_lowercase()))
    }

    /// Returns the full hex id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the abbreviated id used in logs.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }

    /// Converts into a gix object id.
    pub(crate) fn to_object_id(&self) -> Result<gix::ObjectId, RepoError> {
        gix::ObjectId::from_hex(self.0.as_bytes())
            .map_err(|_| RepoError::CommitNotFound(self.0.clone()))
    }

    /// Returns true for the all-zero id GitHub sends for deleted refs.
    pub fn is_null(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl FromStr for CommitId {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CommitId {
    type Error = RepoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

impl From<gix::ObjectId> for CommitId {
    fn from(oid: gix::ObjectId) -> Self {
        Self(oid.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "a1b2c3d4e5f6789012345678901234567890abcd";

    #[test]
    fn test_parse_valid() {
        let id = CommitId::parse(SHA).unwrap();
        assert_eq!(id.as_str(), SHA);
        assert_eq!(id.short(), "a1b2c3d4");
        assert_eq!(id.to_string(), "a1b2c3d4");
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let id = CommitId::parse(&format!(" {} ", SHA.to_uppercase())).unwrap();
        assert_eq!(id.as_str(), SHA);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(CommitId::parse("").is_err());
        assert!(CommitId::parse("a1b2c3d4").is_err());
        assert!(CommitId::parse(&SHA.replace('a', "g")).is_err());
    }

    #[test]
    fn test_null_id() {
        let id = CommitId::parse(&"0".repeat(40)).unwrap();
        assert!(id.is_null());
        assert!(!CommitId::parse(SHA).unwrap().is_null());
    }

    #[test]
    fn test_gix_roundtrip() {
        let id = CommitId::parse(SHA).unwrap();
        let oid = id.to_object_id().unwrap();
        assert_eq!(CommitId::from(oid), id);
    }

    #[test]
    fn test_serde_validates() {
        let id: CommitId = serde_json::from_str(&format!("\"{SHA}\"")).unwrap();
        assert_eq!(id.as_str(), SHA);
        assert!(serde_json::from_str::<CommitId>("\"nope\"").is_err());
    }
}
