//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from haven-state to HTTP status codes and the
//! platform's uniform failure envelope
//! `{"success": false, "error": {code, message, details?}}`.
//! Internal error details are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use haven_state::{ApplicationError, LeaseError, PaymentError};

/// The uniform failure envelope.
///
/// Every non-2xx response carries this shape so dashboard clients have a
/// single error-handling path; `success` is always `false` here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// The error payload.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "INVALID_TRANSITION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request input failed validation (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller's role lacks the capability for this transition (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The transition's state precondition does not hold (409).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The caller lost a compare-and-set race: the entity no longer holds
    /// the status the caller last observed (409). Clients refetch and
    /// retry once before surfacing an error.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A uniqueness invariant would be violated (409).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Internal server error (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
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

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Conflict(_) => tracing::debug!(error = %self, "compare-and-set conflict"),
            _ => {}
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ApplicationError> for AppError {
    fn from(err: ApplicationError) -> Self {
        match &err {
            ApplicationError::Validation(_) => Self::Validation(err.to_string()),
            ApplicationError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            ApplicationError::InvalidTransition { .. } => {
                Self::InvalidTransition(err.to_string())
            }
            ApplicationError::NotApplicant { .. } => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<LeaseError> for AppError {
    fn from(err: LeaseError) -> Self {
        match &err {
            LeaseError::Validation(_) => Self::Validation(err.to_string()),
            LeaseError::NotApproved { .. } => Self::InvalidTransition(err.to_string()),
            LeaseError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            LeaseError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            LeaseError::NotParty { .. } => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match &err {
            PaymentError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            PaymentError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            PaymentError::NotParty { .. } => Self::Forbidden(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::Role;
    use haven_state::{ApplicationStatus, PaymentStatus};

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (
                AppError::InvalidTransition("x".into()),
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
            ),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (AppError::AlreadyExists("x".into()), StatusCode::CONFLICT, "ALREADY_EXISTS"),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let (s, c) = err.status_and_code();
            assert_eq!(s, status);
            assert_eq!(c, code);
        }
    }

    #[test]
    fn test_forbidden_domain_error_maps_to_403() {
        let err = ApplicationError::Forbidden {
            role: Role::Tenant,
            from: ApplicationStatus::Submitted,
            to: ApplicationStatus::UnderReview,
        };
        let app_err = AppError::from(err);
        let (status, _) = app_err.status_and_code();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_invalid_payment_transition_maps_to_409() {
        let err = PaymentError::InvalidTransition {
            from: PaymentStatus::Verified,
            to: PaymentStatus::Paid,
        };
        let app_err = AppError::from(err);
        let (status, code) = app_err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "INVALID_TRANSITION");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: "CONFLICT".to_string(),
                message: "lost the race".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], serde_json::json!(false));
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert!(json["error"].get("details").is_none());
    }

    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal("db password wrong".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.error.message.contains("password"));
        assert_eq!(body.error.message, "An internal error occurred");
    }
}
