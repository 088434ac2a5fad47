//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine, store and validation errors to HTTP status codes and a JSON
//! body carrying a machine-readable code. Internal error details are logged
//! and never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use revas_core::ValidationError;
use revas_engine::{ConflictKind, EngineError, StoreError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "PR_MERGED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed body, query or identifier (400).
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown pull request, user or team (404).
    #[error("{0}")]
    NotFound(String),

    /// Precondition conflict carrying its specific code.
    #[error("{message}")]
    Conflict { kind: ConflictKind, message: String },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            // Duplicate team names are reported as bad input, not a conflict.
            Self::Conflict {
                kind: ConflictKind::TeamExists,
                ..
            } => (StatusCode::BAD_REQUEST, ConflictKind::TeamExists.code()),
            Self::Conflict { kind, .. } => (StatusCode::CONFLICT, kind.code()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(e) => Self::from(e),
            EngineError::NotFound(msg) => Self::NotFound(msg),
            EngineError::Conflict { kind, message } => Self::Conflict { kind, message },
            EngineError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::from(EngineError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn conflict(kind: ConflictKind) -> AppError {
        AppError::Conflict {
            kind,
            message: "conflict".into(),
        }
    }

    #[test]
    fn invalid_request_status_code() {
        let (status, code) = AppError::InvalidRequest("bad".into()).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_REQUEST");
    }

    #[test]
    fn not_found_status_code() {
        let (status, code) = AppError::NotFound("PR not found".into()).status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn review_conflicts_are_409_with_specific_codes() {
        for (kind, expected) in [
            (ConflictKind::PrExists, "PR_EXISTS"),
            (ConflictKind::PrMerged, "PR_MERGED"),
            (ConflictKind::NotAssigned, "NOT_ASSIGNED"),
            (ConflictKind::NoCandidate, "NO_CANDIDATE"),
        ] {
            let (status, code) = conflict(kind).status_and_code();
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(code, expected);
        }
    }

    #[test]
    fn team_exists_is_bad_request() {
        let (status, code) = conflict(ConflictKind::TeamExists).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "TEAM_EXISTS");
    }

    #[test]
    fn validation_error_converts_to_invalid_request() {
        let err = AppError::from(ValidationError::Empty { field: "team_name" });
        match &err {
            AppError::InvalidRequest(msg) => assert!(msg.contains("team_name"), "got: {msg}"),
            other => panic!("expected InvalidRequest, got: {other:?}"),
        }
    }

    #[test]
    fn backend_store_error_converts_to_internal() {
        let err = AppError::from(StoreError::Backend("pool timed out".into()));
        assert!(matches!(err, AppError::Internal(_)));
    }

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_conflict_carries_code() {
        let err = AppError::Conflict {
            kind: ConflictKind::PrMerged,
            message: "cannot reassign on merged PR".into(),
        };
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "PR_MERGED");
        assert_eq!(body.error.message, "cannot reassign on merged PR");
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("relation pr_reviewers missing".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(
            !body.error.message.contains("pr_reviewers"),
            "internal error details must not leak: {}",
            body.error.message
        );
        assert_eq!(body.error.message, "An internal error occurred");
    }
}
