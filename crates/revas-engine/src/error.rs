//! # Engine Errors
//!
//! The four-way taxonomy callers act on: bad input, missing resource,
//! precondition conflict (with its specific subtype) and internal fault.
//! Nothing here is retried; retry policy belongs to the caller.

use thiserror::Error;

use revas_core::ValidationError;
use revas_state::LifecycleError;

use crate::ports::StoreError;

/// The precondition a conflicting request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// A pull request with the requested id already exists.
    PrExists,
    /// The pull request is merged; reviewers are frozen.
    PrMerged,
    /// The reviewer to replace is not on the pull request.
    NotAssigned,
    /// No active candidate is available to take over.
    NoCandidate,
    /// A team with the requested name already exists.
    TeamExists,
}

impl ConflictKind {
    /// The machine-readable code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrExists => "PR_EXISTS",
            Self::PrMerged => "PR_MERGED",
            Self::NotAssigned => "NOT_ASSIGNED",
            Self::NoCandidate => "NO_CANDIDATE",
            Self::TeamExists => "TEAM_EXISTS",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors returned by [`ReviewCoordinator`](crate::ReviewCoordinator)
/// operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed identifier or payload field.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown pull request, user or team.
    #[error("{0}")]
    NotFound(String),

    /// A precondition the caller can act on was not met.
    #[error("{message}")]
    Conflict {
        /// The specific conflict.
        kind: ConflictKind,
        /// Human-readable description.
        message: String,
    },

    /// Storage failure or broken invariant. Never shown to clients verbatim.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn conflict(kind: ConflictKind, message: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            message: message.into(),
        }
    }

    /// The conflict subtype, if this is a conflict.
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            Self::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePullRequest(_) => {
                Self::conflict(ConflictKind::PrExists, "PR id already exists")
            }
            StoreError::TeamExists(_) => {
                Self::conflict(ConflictKind::TeamExists, "team_name already exists")
            }
            StoreError::Stale { .. } => Self::conflict(
                ConflictKind::NotAssigned,
                "reviewer is not assigned to this PR",
            ),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

impl From<LifecycleError> for EngineError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Merged { .. } => {
                Self::conflict(ConflictKind::PrMerged, "cannot reassign on merged PR")
            }
            LifecycleError::NotAssigned { .. } => Self::conflict(
                ConflictKind::NotAssigned,
                "reviewer is not assigned to this PR",
            ),
            // The coordinator never proposes these; reaching one is a bug.
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revas_core::{PullRequestId, UserId};

    #[test]
    fn conflict_codes_are_distinct() {
        let kinds = [
            ConflictKind::PrExists,
            ConflictKind::PrMerged,
            ConflictKind::NotAssigned,
            ConflictKind::NoCandidate,
            ConflictKind::TeamExists,
        ];
        let codes: std::collections::HashSet<&str> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn duplicate_store_error_maps_to_pr_exists() {
        let err = EngineError::from(StoreError::DuplicatePullRequest(
            PullRequestId::new("pr-1").unwrap(),
        ));
        assert_eq!(err.conflict_kind(), Some(ConflictKind::PrExists));
    }

    #[test]
    fn backend_store_error_maps_to_internal() {
        let err = EngineError::from(StoreError::Backend("connection reset".into()));
        assert!(matches!(err, EngineError::Internal(_)));
        assert_eq!(err.conflict_kind(), None);
    }

    #[test]
    fn merged_lifecycle_error_maps_to_pr_merged() {
        let err = EngineError::from(LifecycleError::Merged {
            id: PullRequestId::new("pr-1").unwrap(),
        });
        assert_eq!(err.conflict_kind(), Some(ConflictKind::PrMerged));
    }

    #[test]
    fn author_as_reviewer_is_internal() {
        let err = EngineError::from(LifecycleError::AuthorAsReviewer {
            id: PullRequestId::new("pr-1").unwrap(),
            author: UserId::new(),
        });
        assert!(matches!(err, EngineError::Internal(_)));
    }
}
