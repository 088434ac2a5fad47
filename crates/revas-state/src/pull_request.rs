//! # Pull Request State Machine
//!
//! ## States
//!
//! ```text
//! OPEN ──▶ MERGED
//! ```
//!
//! ## Design Decision
//!
//! With one transition and one terminal state a typestate encoding buys
//! nothing: pull requests are loaded from storage with a runtime status, so
//! the enum with guarded methods returning `Result` is the natural fit.
//! Merging twice is not an error; the second call reports
//! [`MergeOutcome::AlreadyMerged`] and leaves the merge timestamp untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use revas_core::{PullRequestId, UserId, ValidationError, MAX_IDENTIFIER_LEN};

/// Maximum number of reviewers concurrently assigned to one pull request.
pub const MAX_REVIEWERS: usize = 2;

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestStatus {
    /// Under review; reviewers may be attached and replaced.
    Open,
    /// Merged (terminal).
    Merged,
}

impl PullRequestStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Merged)
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PullRequestStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by lifecycle transitions and reviewer mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Reviewer mutation attempted on a merged pull request.
    #[error("pull request {id} is merged")]
    Merged {
        /// The pull request identifier.
        id: PullRequestId,
    },

    /// The reviewer to replace is not on the pull request.
    #[error("user {reviewer} is not assigned to pull request {id}")]
    NotAssigned {
        /// The pull request identifier.
        id: PullRequestId,
        /// The reviewer that was expected to be assigned.
        reviewer: UserId,
    },

    /// The author cannot review their own pull request.
    #[error("author {author} cannot review pull request {id}")]
    AuthorAsReviewer {
        /// The pull request identifier.
        id: PullRequestId,
        /// The author.
        author: UserId,
    },

    /// The user already reviews this pull request.
    #[error("user {reviewer} already reviews pull request {id}")]
    AlreadyReviewer {
        /// The pull request identifier.
        id: PullRequestId,
        /// The duplicate reviewer.
        reviewer: UserId,
    },

    /// Attaching would exceed [`MAX_REVIEWERS`].
    #[error("pull request {id} cannot have more than {max} reviewers")]
    TooManyReviewers {
        /// The pull request identifier.
        id: PullRequestId,
        /// The reviewer limit.
        max: usize,
    },

    /// A stored status string was not recognized.
    #[error("unknown pull request status {0:?}")]
    UnknownStatus(String),
}

// ─── Records ─────────────────────────────────────────────────────────

/// Result of a merge request against the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// OPEN → MERGED happened now.
    Merged,
    /// The pull request was already merged; nothing changed.
    AlreadyMerged,
}

/// A reviewer's slot on a pull request. `order_index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerAssignment {
    pub pull_request_id: PullRequestId,
    pub reviewer_id: UserId,
    pub order_index: u32,
}

/// A pull request with its ordered reviewer list.
///
/// `reviewers[i]` holds order index `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: PullRequestId,
    pub name: String,
    pub author_id: UserId,
    pub status: PullRequestStatus,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub reviewers: Vec<UserId>,
}

impl PullRequest {
    /// Create a new OPEN pull request with no reviewers.
    pub fn open(
        id: PullRequestId,
        name: &str,
        author_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty {
                field: "pull_request_name",
            });
        }
        if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(ValidationError::TooLong {
                field: "pull_request_name",
                max: MAX_IDENTIFIER_LEN,
            });
        }
        Ok(Self {
            id,
            name: trimmed.to_string(),
            author_id,
            status: PullRequestStatus::Open,
            created_at,
            merged_at: None,
            reviewers: Vec::new(),
        })
    }

    /// Whether the pull request is still open.
    pub fn is_open(&self) -> bool {
        self.status == PullRequestStatus::Open
    }

    /// Merge the pull request (OPEN → MERGED).
    ///
    /// Idempotent: merging a merged pull request succeeds and keeps the
    /// original merge timestamp.
    pub fn merge(&mut self, now: DateTime<Utc>) -> MergeOutcome {
        match self.status {
            PullRequestStatus::Merged => MergeOutcome::AlreadyMerged,
            PullRequestStatus::Open => {
                self.status = PullRequestStatus::Merged;
                self.merged_at.get_or_insert(now);
                MergeOutcome::Merged
            }
        }
    }

    /// Reject any reviewer mutation unless the pull request is OPEN.
    pub fn ensure_open(&self) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(LifecycleError::Merged {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Whether `user` currently reviews this pull request.
    pub fn has_reviewer(&self, user: &UserId) -> bool {
        self.reviewers.contains(user)
    }

    /// The 1-based order index of `reviewer`, if assigned.
    pub fn order_index_of(&self, reviewer: &UserId) -> Option<u32> {
        self.reviewers
            .iter()
            .position(|r| r == reviewer)
            .map(|pos| pos as u32 + 1)
    }

    /// Append reviewers after the current ones, in the given order.
    ///
    /// All-or-nothing: on error the reviewer list is unchanged.
    pub fn attach_reviewers(&mut self, reviewers: &[UserId]) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        if self.reviewers.len() + reviewers.len() > MAX_REVIEWERS {
            return Err(LifecycleError::TooManyReviewers {
                id: self.id.clone(),
                max: MAX_REVIEWERS,
            });
        }
        for (i, reviewer) in reviewers.iter().enumerate() {
            self.check_candidate(reviewer)?;
            if reviewers[..i].contains(reviewer) {
                return Err(LifecycleError::AlreadyReviewer {
                    id: self.id.clone(),
                    reviewer: *reviewer,
                });
            }
        }
        self.reviewers.extend_from_slice(reviewers);
        Ok(())
    }

    /// Replace `old` with `new`, keeping `old`'s order index.
    ///
    /// Returns the order index that changed hands.
    pub fn replace_reviewer(&mut self, old: &UserId, new: &UserId) -> Result<u32, LifecycleError> {
        self.ensure_open()?;
        let pos = self
            .reviewers
            .iter()
            .position(|r| r == old)
            .ok_or_else(|| LifecycleError::NotAssigned {
                id: self.id.clone(),
                reviewer: *old,
            })?;
        self.check_candidate(new)?;
        self.reviewers[pos] = *new;
        Ok(pos as u32 + 1)
    }

    /// The reviewer slots of this pull request in order.
    pub fn assignments(&self) -> Vec<ReviewerAssignment> {
        self.reviewers
            .iter()
            .enumerate()
            .map(|(i, reviewer)| ReviewerAssignment {
                pull_request_id: self.id.clone(),
                reviewer_id: *reviewer,
                order_index: i as u32 + 1,
            })
            .collect()
    }

    /// A new reviewer must be neither the author nor an existing reviewer.
    fn check_candidate(&self, candidate: &UserId) -> Result<(), LifecycleError> {
        if *candidate == self.author_id {
            return Err(LifecycleError::AuthorAsReviewer {
                id: self.id.clone(),
                author: self.author_id,
            });
        }
        if self.has_reviewer(candidate) {
            return Err(LifecycleError::AlreadyReviewer {
                id: self.id.clone(),
                reviewer: *candidate,
            });
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
