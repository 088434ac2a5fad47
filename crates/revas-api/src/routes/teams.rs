//! # Team Routes
//!
//! Team creation with member upsert, and team lookup.

use std::collections::HashSet;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use revas_core::{Team, TeamMember, TeamName, UserId, ValidationError};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, extract_validated_query, Validate};
use crate::state::AppState;
use crate::views::{TeamResponse, TeamView};

/// A member entry of [`AddTeamRequest`].
#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamMemberInput {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// Request to create a team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTeamRequest {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMemberInput>,
}

impl Validate for AddTeamRequest {
    type Validated = Team;

    fn validate(self) -> Result<Team, ValidationError> {
        let name = TeamName::new(&self.team_name)?;
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(self.members.len());
        for input in self.members {
            let id = UserId::parse("user_id", &input.user_id)?;
            if !seen.insert(id) {
                return Err(ValidationError::Duplicate {
                    field: "user_id",
                    value: id.to_string(),
                });
            }
            members.push(TeamMember::new(id, &input.username, input.is_active)?);
        }
        Ok(Team { name, members })
    }
}

/// Query for [`get_team`].
#[derive(Debug, Deserialize, IntoParams)]
pub struct TeamQuery {
    /// Name of the team.
    pub team_name: Option<String>,
}

impl Validate for TeamQuery {
    type Validated = TeamName;

    fn validate(self) -> Result<TeamName, ValidationError> {
        TeamName::new(self.team_name.unwrap_or_default())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
}

/// POST /team/add: Create a team and upsert its members.
#[utoipa::path(
    post,
    path = "/team/add",
    request_body = AddTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Invalid request or team exists", body = crate::error::ErrorBody),
    ),
    tag = "teams"
)]
pub(crate) async fn add_team(
    State(state): State<AppState>,
    body: Result<Json<AddTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), AppError> {
    let team = extract_validated_json(body)?;
    state.store().add_team(&team).await?;
    tracing::info!(team = %team.name, members = team.members.len(), "team created");

    let stored = state.store().get_team(&team.name).await?;
    let view = TeamView::from(stored.as_ref().unwrap_or(&team));
    Ok((StatusCode::CREATED, Json(TeamResponse { team: view })))
}

/// GET /team/get: Fetch a team with all its members.
#[utoipa::path(
    get,
    path = "/team/get",
    params(TeamQuery),
    responses(
        (status = 200, description = "Team found", body = TeamView),
        (status = 400, description = "Missing team_name", body = crate::error::ErrorBody),
        (status = 404, description = "Team not found", body = crate::error::ErrorBody),
    ),
    tag = "teams"
)]
pub(crate) async fn get_team(
    State(state): State<AppState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<TeamView>, AppError> {
    let name = extract_validated_query(query)?;
    let team = state
        .store()
        .get_team(&name)
        .await?
        .ok_or_else(|| AppError::NotFound("team not found".into()))?;
    Ok(Json(TeamView::from(&team)))
}
