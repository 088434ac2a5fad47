//! # Storage Ports
//!
//! Narrow capability traits the engine consumes. Each backend (in-memory,
//! Postgres) implements all of them; each coordinator operation asks only
//! for the capabilities it uses, so reassignment never sees the directory's
//! write methods and nothing is cast from one interface to another.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use revas_core::{PullRequestId, ReviewerReassignment, Team, TeamName, User, UserId};
use revas_state::PullRequest;

/// Errors reported by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Insert of a pull request whose id is taken.
    #[error("pull request {0} already exists")]
    DuplicatePullRequest(PullRequestId),

    /// Insert of a team whose name is taken.
    #[error("team {0} already exists")]
    TeamExists(TeamName),

    /// A batched reassignment no longer matches stored state: the PR is
    /// merged, the old reviewer left the slot, or the new reviewer already
    /// holds another slot. The whole batch was rolled back.
    #[error("stale reassignment of {old_reviewer_id} on pull request {pull_request_id}")]
    Stale {
        pull_request_id: PullRequestId,
        old_reviewer_id: UserId,
    },

    /// Connection, query or other backend fault.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Outcome of a single row-locked reviewer replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The new reviewer now holds the old reviewer's slot.
    Replaced,
    /// The pull request was merged in the meantime.
    Merged,
    /// The old reviewer no longer holds a slot, or the new one already does.
    Stale,
    /// The pull request does not exist.
    Missing,
}

/// Read-only user and team resolution, the only directory capability the
/// coordinator needs.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Get a user by id.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Get a team with all its members, active or not.
    async fn get_team(&self, name: &TeamName) -> Result<Option<Team>, StoreError>;
}

/// Team and user administration.
#[async_trait]
pub trait Directory: UserLookup {
    /// Create `team` and upsert its members into it, atomically.
    ///
    /// Fails with [`StoreError::TeamExists`] if the name is taken. A member
    /// that already exists elsewhere moves to this team.
    async fn add_team(&self, team: &Team) -> Result<(), StoreError>;

    /// Set a user's activity flag, returning the updated user.
    async fn set_is_active(&self, id: &UserId, is_active: bool)
        -> Result<Option<User>, StoreError>;
}

/// Pull requests and their ordered reviewer slots.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    /// Insert a new pull request (without reviewers).
    ///
    /// Fails with [`StoreError::DuplicatePullRequest`] if the id is taken.
    async fn create_pull_request(&self, pr: &PullRequest) -> Result<(), StoreError>;

    /// Get a pull request with its reviewers in slot order.
    async fn get_pull_request(&self, id: &PullRequestId)
        -> Result<Option<PullRequest>, StoreError>;

    /// Append reviewers to a pull request's slots, in order.
    async fn assign_reviewers(
        &self,
        id: &PullRequestId,
        reviewers: &[UserId],
    ) -> Result<(), StoreError>;

    /// Mark a pull request merged. An existing merge timestamp is kept.
    async fn mark_merged(
        &self,
        id: &PullRequestId,
        at: DateTime<Utc>,
    ) -> Result<Option<PullRequest>, StoreError>;

    /// Replace one reviewer under a row lock on the pull request.
    async fn replace_reviewer(
        &self,
        reassignment: &ReviewerReassignment,
    ) -> Result<ReplaceOutcome, StoreError>;

    /// Open pull requests with at least one reviewer in `reviewers`,
    /// newest first.
    async fn open_with_reviewers_in(
        &self,
        reviewers: &[UserId],
    ) -> Result<Vec<PullRequest>, StoreError>;

    /// Apply every reassignment or none of them.
    ///
    /// A command that no longer matches stored state fails the batch with
    /// [`StoreError::Stale`].
    async fn apply_reassignments(&self, batch: &[ReviewerReassignment])
        -> Result<(), StoreError>;

    /// Pull requests on which `reviewer` holds a slot, newest first.
    async fn reviewed_by(&self, reviewer: &UserId) -> Result<Vec<PullRequest>, StoreError>;
}

/// Assignment count for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAssignmentStat {
    pub user_id: UserId,
    pub username: String,
    pub assignment_count: u64,
}

/// Pull request totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestStats {
    pub total: u64,
    pub open: u64,
    pub merged: u64,
    pub total_assignments: u64,
}

/// Read-only aggregate counts.
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    /// Slot counts for every user, highest first, ties by username.
    async fn user_assignment_stats(&self) -> Result<Vec<UserAssignmentStat>, StoreError>;

    /// Pull request totals.
    async fn pull_request_stats(&self) -> Result<PullRequestStats, StoreError>;
}

/// A complete backend.
#[async_trait]
pub trait ReviewStore: Directory + PullRequestStore + StatisticsSource {
    /// Apply `batch` and then deactivate `users` (restricted to rows of
    /// `team` that are still active) in one atomic unit.
    ///
    /// Returns the users actually deactivated. On error nothing changed.
    async fn commit_team_deactivation(
        &self,
        team: &TeamName,
        users: &[UserId],
        batch: &[ReviewerReassignment],
    ) -> Result<Vec<UserId>, StoreError>;
}
