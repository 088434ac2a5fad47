//! # Statistics Route
//!
//! Per-user reviewer assignment counts and pull request totals.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppError;
use crate::state::AppState;
use crate::views::{PrStatsView, StatisticsResponse, UserAssignmentView};

pub fn router() -> Router<AppState> {
    Router::new().route("/statistics", get(get_statistics))
}

/// GET /statistics: Assignment counts per user (most assigned first) and
/// pull request totals.
#[utoipa::path(
    get,
    path = "/statistics",
    responses(
        (status = 200, description = "Current statistics", body = StatisticsResponse),
    ),
    tag = "statistics"
)]
pub(crate) async fn get_statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, AppError> {
    let users = state.store().user_assignment_stats().await?;
    let totals = state.store().pull_request_stats().await?;
    Ok(Json(StatisticsResponse {
        user_assignments: users.iter().map(UserAssignmentView::from).collect(),
        pr_stats: PrStatsView::from(totals),
    }))
}
