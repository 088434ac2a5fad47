//! # Response Projections
//!
//! Explicit JSON shapes built from the canonical domain records. The same
//! pull request is rendered in full, in short form (no reviewers, no merge
//! time) and inside the reassignment result, each by its own type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use revas_core::{Team, TeamMember, User};
use revas_engine::{BulkDeactivation, PullRequestReassignment, PullRequestStats, UserAssignmentStat};
use revas_state::PullRequest;

/// A pull request with its assigned reviewers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PullRequestView {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: Uuid,
    /// `OPEN` or `MERGED`.
    pub status: String,
    /// Reviewer ids in slot order.
    pub assigned_reviewers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<&PullRequest> for PullRequestView {
    fn from(pr: &PullRequest) -> Self {
        Self {
            pull_request_id: pr.id.to_string(),
            pull_request_name: pr.name.clone(),
            author_id: pr.author_id.0,
            status: pr.status.to_string(),
            assigned_reviewers: pr
                .reviewers
                .iter()
                .filter(|r| **r != pr.author_id)
                .map(|r| r.0)
                .collect(),
            created_at: pr.created_at,
            merged_at: pr.merged_at,
        }
    }
}

/// A pull request without reviewers, as listed for a reviewer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PullRequestShortView {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PullRequest> for PullRequestShortView {
    fn from(pr: &PullRequest) -> Self {
        Self {
            pull_request_id: pr.id.to_string(),
            pull_request_name: pr.name.clone(),
            author_id: pr.author_id.0,
            status: pr.status.to_string(),
            created_at: pr.created_at,
        }
    }
}

/// `{"pr": ...}` envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PullRequestResponse {
    pub pr: PullRequestView,
}

/// Result of a single reassignment.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReassignResponse {
    pub pr: PullRequestView,
    /// The reviewer who took over the slot.
    pub replaced_by: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamMemberView {
    pub user_id: Uuid,
    pub username: String,
    pub is_active: bool,
}

impl From<&TeamMember> for TeamMemberView {
    fn from(m: &TeamMember) -> Self {
        Self {
            user_id: m.id.0,
            username: m.username.clone(),
            is_active: m.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamView {
    pub team_name: String,
    pub members: Vec<TeamMemberView>,
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            team_name: team.name.to_string(),
            members: team.members.iter().map(TeamMemberView::from).collect(),
        }
    }
}

/// `{"team": ...}` envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    pub team: TeamView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub user_id: Uuid,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.0,
            username: user.username.clone(),
            team_name: user.team_name.to_string(),
            is_active: user.is_active,
        }
    }
}

/// `{"user": ...}` envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user: UserView,
}

/// Pull requests a user reviews.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserReviewsResponse {
    pub user_id: Uuid,
    pub pull_requests: Vec<PullRequestShortView>,
}

/// Per-PR summary of a team deactivation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrReassignmentView {
    pub pr_id: String,
    /// Old reviewers that were replaced.
    pub replaced: Vec<Uuid>,
    /// Their replacements, position by position.
    pub new_reviewers: Vec<Uuid>,
    /// Reviewers kept for lack of candidates.
    pub unreplaced: Vec<Uuid>,
}

impl From<&PullRequestReassignment> for PrReassignmentView {
    fn from(r: &PullRequestReassignment) -> Self {
        Self {
            pr_id: r.pull_request_id.to_string(),
            replaced: r.swaps.iter().map(|s| s.old_reviewer_id.0).collect(),
            new_reviewers: r.swaps.iter().map(|s| s.new_reviewer_id.0).collect(),
            unreplaced: r.unreplaced.iter().map(|u| u.0).collect(),
        }
    }
}

/// Result of a team deactivation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkDeactivateResponse {
    pub deactivated_users: Vec<Uuid>,
    pub reassigned_prs: Vec<PrReassignmentView>,
    /// Pull requests whose author or author team could not be resolved.
    pub skipped_prs: Vec<String>,
    pub duration_ms: u64,
}

impl From<&BulkDeactivation> for BulkDeactivateResponse {
    fn from(result: &BulkDeactivation) -> Self {
        Self {
            deactivated_users: result.deactivated.iter().map(|u| u.0).collect(),
            reassigned_prs: result.reassigned.iter().map(PrReassignmentView::from).collect(),
            skipped_prs: result.skipped.iter().map(|id| id.to_string()).collect(),
            duration_ms: result.duration_ms,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserAssignmentView {
    pub user_id: Uuid,
    pub username: String,
    pub count: u64,
}

impl From<&UserAssignmentStat> for UserAssignmentView {
    fn from(s: &UserAssignmentStat) -> Self {
        Self {
            user_id: s.user_id.0,
            username: s.username.clone(),
            count: s.assignment_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrStatsView {
    pub total_prs: u64,
    pub open_prs: u64,
    pub merged_prs: u64,
    pub total_assignments: u64,
}

impl From<PullRequestStats> for PrStatsView {
    fn from(s: PullRequestStats) -> Self {
        Self {
            total_prs: s.total,
            open_prs: s.open,
            merged_prs: s.merged,
            total_assignments: s.total_assignments,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatisticsResponse {
    pub user_assignments: Vec<UserAssignmentView>,
    pub pr_stats: PrStatsView,
}
