//! # revas-api: HTTP Service for Reviewer Assignment
//!
//! Exposes teams, users and the pull request lifecycle over JSON, with
//! reviewers assigned and reassigned by the
//! [`ReviewCoordinator`](revas_engine::ReviewCoordinator).
//!
//! ## API Surface
//!
//! | Path                          | Module                      |
//! |-------------------------------|-----------------------------|
//! | `/team/*`                     | [`routes::teams`]           |
//! | `/users/*`                    | [`routes::users`]           |
//! | `/pullRequest/*`              | [`routes::pull_requests`]   |
//! | `/statistics`                 | [`routes::statistics`]      |
//! | `/health`, `/health/*`        | this module                 |
//! | `/openapi.json`               | [`openapi`]                 |
//!
//! ## Storage
//!
//! Postgres through [`db::PgStore`] when a database is configured, the
//! in-memory store otherwise.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod views;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

pub use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::teams::router())
        .merge(routes::users::router())
        .merge(routes::pull_requests::router())
        .merge(routes::statistics::router())
        .merge(openapi::router());

    let health = Router::new()
        .route("/health", get(health))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new()
        .merge(health)
        .merge(api)
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}

/// Plain health check.
async fn health() -> &'static str {
    "OK"
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 503 when the configured database does not
/// answer.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}
