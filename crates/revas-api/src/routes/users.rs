//! # User Routes
//!
//! Activity toggling, the per-reviewer pull request listing, and the team
//! deactivation cascade.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use revas_core::{TeamName, UserId, ValidationError};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, extract_validated_query, Validate};
use crate::state::AppState;
use crate::views::{
    BulkDeactivateResponse, PullRequestShortView, UserResponse, UserReviewsResponse, UserView,
};

/// Request to set a user's activity flag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetIsActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

impl Validate for SetIsActiveRequest {
    type Validated = (UserId, bool);

    fn validate(self) -> Result<(UserId, bool), ValidationError> {
        Ok((UserId::parse("user_id", &self.user_id)?, self.is_active))
    }
}

/// Query for [`get_review`].
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewQuery {
    /// Reviewer to list pull requests for.
    pub user_id: Option<String>,
}

impl Validate for ReviewQuery {
    type Validated = UserId;

    fn validate(self) -> Result<UserId, ValidationError> {
        let raw = self
            .user_id
            .ok_or(ValidationError::Empty { field: "user_id" })?;
        UserId::parse("user_id", &raw)
    }
}

/// Request to deactivate every active member of a team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeactivateRequest {
    pub team_name: String,
}

impl Validate for BulkDeactivateRequest {
    type Validated = TeamName;

    fn validate(self) -> Result<TeamName, ValidationError> {
        TeamName::new(&self.team_name)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_review))
        .route("/users/bulkDeactivateTeam", post(bulk_deactivate_team))
}

/// POST /users/setIsActive: Set a user's activity flag.
#[utoipa::path(
    post,
    path = "/users/setIsActive",
    request_body = SetIsActiveRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn set_is_active(
    State(state): State<AppState>,
    body: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let (id, is_active) = extract_validated_json(body)?;
    let user = state
        .store()
        .set_is_active(&id, is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    tracing::info!(user_id = %id, is_active, "user activity updated");
    Ok(Json(UserResponse {
        user: UserView::from(&user),
    }))
}

/// GET /users/getReview: Pull requests the user reviews, newest first.
#[utoipa::path(
    get,
    path = "/users/getReview",
    params(ReviewQuery),
    responses(
        (status = 200, description = "Assigned pull requests", body = UserReviewsResponse),
        (status = 400, description = "Invalid user_id", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn get_review(
    State(state): State<AppState>,
    query: Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<Json<UserReviewsResponse>, AppError> {
    let id = extract_validated_query(query)?;
    let prs = state.coordinator.reviews_of(&id).await?;
    Ok(Json(UserReviewsResponse {
        user_id: id.0,
        pull_requests: prs.iter().map(PullRequestShortView::from).collect(),
    }))
}

/// POST /users/bulkDeactivateTeam: Deactivate a team, reassigning its
/// members' open reviews first.
#[utoipa::path(
    post,
    path = "/users/bulkDeactivateTeam",
    request_body = BulkDeactivateRequest,
    responses(
        (status = 200, description = "Team deactivated", body = BulkDeactivateResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 404, description = "Team not found", body = crate::error::ErrorBody),
        (status = 500, description = "Batch could not be committed", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn bulk_deactivate_team(
    State(state): State<AppState>,
    body: Result<Json<BulkDeactivateRequest>, JsonRejection>,
) -> Result<Json<BulkDeactivateResponse>, AppError> {
    let team = extract_validated_json(body)?;
    let result = state.coordinator.bulk_deactivate_team(&team).await?;
    Ok(Json(BulkDeactivateResponse::from(&result)))
}
