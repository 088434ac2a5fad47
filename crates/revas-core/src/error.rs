//! # Validation Errors
//!
//! Errors raised when caller-supplied identifiers or payload fields are
//! malformed. These are always surfaced to the caller as bad input and are
//! never retried.

use thiserror::Error;

/// A caller-supplied value failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field exceeded the maximum permitted length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// A user identifier was not a valid UUID.
    #[error("invalid {field}: {value:?} is not a UUID")]
    InvalidUserId {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// The same value appeared twice where each must be unique.
    #[error("duplicate {field}: {value}")]
    Duplicate {
        /// Name of the offending field.
        field: &'static str,
        /// The repeated value.
        value: String,
    },
}
