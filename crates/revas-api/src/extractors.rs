//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait that turns raw request DTOs into domain
//! commands, and helpers that map extractor rejections to
//! [`AppError::InvalidRequest`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use revas_core::ValidationError;

use crate::error::AppError;

/// Request types that validate into a typed domain value.
pub trait Validate {
    /// The validated form of the request.
    type Validated;

    /// Check field rules and convert to domain types.
    fn validate(self) -> Result<Self::Validated, ValidationError>;
}

/// Extract a JSON body, mapping deserialization errors to
/// [`AppError::InvalidRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::InvalidRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Validated, AppError> {
    Ok(extract_json(result)?.validate()?)
}

/// Extract query parameters and validate them.
pub fn extract_validated_query<T: Validate>(
    result: Result<Query<T>, QueryRejection>,
) -> Result<T::Validated, AppError> {
    let Query(value) = result.map_err(|err| AppError::InvalidRequest(err.body_text()))?;
    Ok(value.validate()?)
}
