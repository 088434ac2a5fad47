//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "revas: Reviewer Assignment Service",
        description = "Teams, users and pull requests with automatic reviewer assignment.\n\n- **Pull requests** get up to two active reviewers from the author's team on creation\n- **Reassignment** replaces one reviewer with an active member of that reviewer's team\n- **Team deactivation** moves open reviews away from a team before deactivating it\n\nAll errors use the body `{\"error\": {\"code\", \"message\"}}`."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Teams ───────────────────────────────────────────────────────
        crate::routes::teams::add_team,
        crate::routes::teams::get_team,
        // ── Users ───────────────────────────────────────────────────────
        crate::routes::users::set_is_active,
        crate::routes::users::get_review,
        crate::routes::users::bulk_deactivate_team,
        // ── Pull requests ───────────────────────────────────────────────
        crate::routes::pull_requests::create_pull_request,
        crate::routes::pull_requests::merge_pull_request,
        crate::routes::pull_requests::reassign_reviewer,
        // ── Statistics ──────────────────────────────────────────────────
        crate::routes::statistics::get_statistics,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Request DTOs ────────────────────────────────────────────
            crate::routes::teams::AddTeamRequest,
            crate::routes::teams::TeamMemberInput,
            crate::routes::users::SetIsActiveRequest,
            crate::routes::users::BulkDeactivateRequest,
            crate::routes::pull_requests::CreatePullRequestRequest,
            crate::routes::pull_requests::MergePullRequestRequest,
            crate::routes::pull_requests::ReassignRequest,
            // ── Responses ───────────────────────────────────────────────
            crate::views::PullRequestView,
            crate::views::PullRequestShortView,
            crate::views::PullRequestResponse,
            crate::views::ReassignResponse,
            crate::views::TeamView,
            crate::views::TeamMemberView,
            crate::views::TeamResponse,
            crate::views::UserView,
            crate::views::UserResponse,
            crate::views::UserReviewsResponse,
            crate::views::PrReassignmentView,
            crate::views::BulkDeactivateResponse,
            crate::views::UserAssignmentView,
            crate::views::PrStatsView,
            crate::views::StatisticsResponse,
        )
    ),
    tags(
        (name = "teams", description = "Team creation and lookup"),
        (name = "users", description = "User activity, review listing and team deactivation"),
        (name = "pull_requests", description = "Pull request lifecycle and reviewer reassignment"),
        (name = "statistics", description = "Assignment statistics"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
