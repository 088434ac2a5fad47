//! # Identifier Newtypes
//!
//! Users are keyed by UUID. Teams are keyed by their unique name. Pull
//! requests are keyed by a caller-chosen string, or a generated UUID string
//! when the caller omits one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length (in characters) of any string identifier or display name.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Trim `raw` and check it is non-empty and within [`MAX_IDENTIFIER_LEN`].
pub(crate) fn validated_text(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_IDENTIFIER_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Unique identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user identifier from caller input.
    ///
    /// `field` names the request field in the resulting error.
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidUserId {
                field,
                value: raw.to_string(),
            })
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique name of a team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamName(String);

impl TeamName {
    /// Create a validated team name (trimmed, non-empty, at most 255 chars).
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        validated_text("team_name", raw.as_ref()).map(Self)
    }

    /// Return the team name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TeamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestId(String);

impl PullRequestId {
    /// Create a validated pull request identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        validated_text("pull_request_id", raw.as_ref()).map(Self)
    }

    /// Generate a fresh identifier for a pull request created without one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_uuid() {
        let raw = "7f1c6f8e-4a53-4f43-9d7a-2f4f0e8b9a10";
        let id = UserId::parse("user_id", raw).unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn user_id_rejects_garbage() {
        let err = UserId::parse("author_id", "u1").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidUserId {
                field: "author_id",
                value: "u1".to_string()
            }
        );
        assert!(err.to_string().contains("author_id"));
    }

    #[test]
    fn team_name_is_trimmed() {
        let name = TeamName::new("  backend ").unwrap();
        assert_eq!(name.as_str(), "backend");
    }

    #[test]
    fn team_name_rejects_blank() {
        assert_eq!(
            TeamName::new("   ").unwrap_err(),
            ValidationError::Empty { field: "team_name" }
        );
    }

    #[test]
    fn pull_request_id_rejects_overlong() {
        let long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(matches!(
            PullRequestId::new(long),
            Err(ValidationError::TooLong { field: "pull_request_id", .. })
        ));
        assert!(PullRequestId::new("x".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn generated_pull_request_ids_are_unique() {
        let a = PullRequestId::generate();
        let b = PullRequestId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn identifiers_serialize_transparently() {
        let pr = PullRequestId::new("pr-1001").unwrap();
        assert_eq!(serde_json::to_string(&pr).unwrap(), "\"pr-1001\"");
        let team = TeamName::new("payments").unwrap();
        assert_eq!(serde_json::to_string(&team).unwrap(), "\"payments\"");
    }
}
