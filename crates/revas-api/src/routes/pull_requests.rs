//! # Pull Request Routes
//!
//! Creation with initial reviewer assignment, idempotent merge, and single
//! reviewer reassignment.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use revas_core::{PullRequestId, UserId, ValidationError};
use revas_engine::CreatePullRequest;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;
use crate::views::{PullRequestResponse, PullRequestView, ReassignResponse};

/// Request to open a pull request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePullRequestRequest {
    /// Generated when omitted or blank.
    pub pull_request_id: Option<String>,
    pub pull_request_name: String,
    pub author_id: String,
}

impl Validate for CreatePullRequestRequest {
    type Validated = CreatePullRequest;

    fn validate(self) -> Result<CreatePullRequest, ValidationError> {
        let id = self
            .pull_request_id
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(PullRequestId::new)
            .transpose()?;
        Ok(CreatePullRequest {
            id,
            name: self.pull_request_name,
            author_id: UserId::parse("author_id", &self.author_id)?,
        })
    }
}

/// Request to merge a pull request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MergePullRequestRequest {
    pub pull_request_id: String,
}

impl Validate for MergePullRequestRequest {
    type Validated = PullRequestId;

    fn validate(self) -> Result<PullRequestId, ValidationError> {
        PullRequestId::new(&self.pull_request_id)
    }
}

/// Request to replace one reviewer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    /// The reviewer giving up their slot. Checked against the pull
    /// request's reviewers, not parsed up front.
    pub old_user_id: String,
}

impl Validate for ReassignRequest {
    type Validated = (PullRequestId, String);

    fn validate(self) -> Result<(PullRequestId, String), ValidationError> {
        let pr_id = PullRequestId::new(&self.pull_request_id)?;
        let old_user_id = self.old_user_id.trim();
        if old_user_id.is_empty() {
            return Err(ValidationError::Empty {
                field: "old_user_id",
            });
        }
        Ok((pr_id, old_user_id.to_string()))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_reviewer))
}

/// POST /pullRequest/create: Open a pull request and assign reviewers.
#[utoipa::path(
    post,
    path = "/pullRequest/create",
    request_body = CreatePullRequestRequest,
    responses(
        (status = 201, description = "Pull request created", body = PullRequestResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 404, description = "Author or team not found", body = crate::error::ErrorBody),
        (status = 409, description = "PR_EXISTS", body = crate::error::ErrorBody),
    ),
    tag = "pull_requests"
)]
pub(crate) async fn create_pull_request(
    State(state): State<AppState>,
    body: Result<Json<CreatePullRequestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PullRequestResponse>), AppError> {
    let request = extract_validated_json(body)?;
    let pr = state.coordinator.create_pull_request(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(PullRequestResponse {
            pr: PullRequestView::from(&pr),
        }),
    ))
}

/// POST /pullRequest/merge: Merge a pull request. Repeat merges return
/// the merged pull request unchanged.
#[utoipa::path(
    post,
    path = "/pullRequest/merge",
    request_body = MergePullRequestRequest,
    responses(
        (status = 200, description = "Pull request merged", body = PullRequestResponse),
        (status = 404, description = "Pull request not found", body = crate::error::ErrorBody),
    ),
    tag = "pull_requests"
)]
pub(crate) async fn merge_pull_request(
    State(state): State<AppState>,
    body: Result<Json<MergePullRequestRequest>, JsonRejection>,
) -> Result<Json<PullRequestResponse>, AppError> {
    let id = extract_validated_json(body)?;
    let pr = state.coordinator.merge(&id).await?;
    Ok(Json(PullRequestResponse {
        pr: PullRequestView::from(&pr),
    }))
}

/// POST /pullRequest/reassign: Replace one reviewer with a random active
/// member of that reviewer's team.
#[utoipa::path(
    post,
    path = "/pullRequest/reassign",
    request_body = ReassignRequest,
    responses(
        (status = 200, description = "Reviewer replaced", body = ReassignResponse),
        (status = 400, description = "Missing pull_request_id or old_user_id", body = crate::error::ErrorBody),
        (status = 404, description = "Pull request, user or team not found", body = crate::error::ErrorBody),
        (status = 409, description = "PR_MERGED, NOT_ASSIGNED or NO_CANDIDATE", body = crate::error::ErrorBody),
    ),
    tag = "pull_requests"
)]
pub(crate) async fn reassign_reviewer(
    State(state): State<AppState>,
    body: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<ReassignResponse>, AppError> {
    let (pr_id, old_reviewer) = extract_validated_json(body)?;
    let outcome = state
        .coordinator
        .reassign_reviewer_raw(&pr_id, &old_reviewer)
        .await?;
    Ok(Json(ReassignResponse {
        pr: PullRequestView::from(&outcome.pull_request),
        replaced_by: outcome.replaced_by.0,
    }))
}
