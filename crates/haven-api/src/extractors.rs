//! # Validated JSON Extraction
//!
//! Request bodies are taken as `Result<Json<T>, JsonRejection>` so a parse
//! failure surfaces as the platform's 400 envelope instead of Axum's
//! default rejection, then run through the type's [`Validate`] impl.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Shape validation for request bodies, applied after deserialization.
pub trait Validate {
    /// Return a human-readable description of the first violation found.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body and validate it.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
