//! # Error Types
//!
//! Core error hierarchy. Crates further up the stack define their own
//! `thiserror` enums and wrap these with `#[from]`.

use thiserror::Error;

/// Top-level error type for `badge-core`.
#[derive(Error, Debug)]
pub enum BadgeError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A timestamp could not be parsed or was out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// A field required for the signed payload is missing or empty.
    #[error("required field `{0}` is missing or empty")]
    MissingField(String),

    /// A field is present but has the wrong shape.
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The value to canonicalize is not a JSON object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
