//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use auditlens_core::AuditError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - a required collaborator is not reachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Error from the audit engine
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Audit(ref e) => match e {
                // Caller errors → 400
                AuditError::UnknownRule(_) => StatusCode::BAD_REQUEST,
                AuditError::NotFound(_) => StatusCode::NOT_FOUND,

                // Collaborator failures → 503
                AuditError::Listing(_)
                | AuditError::Fetch(_)
                | AuditError::Classification(_)
                | AuditError::Http(_)
                | AuditError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,

                // Internal processing failures → 500
                AuditError::Fingerprint(_)
                | AuditError::Persistence(_)
                | AuditError::RuleSet(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Audit(ref e) => match e {
                AuditError::UnknownRule(_) => "UNKNOWN_RULE",
                AuditError::NotFound(_) => "OBJECT_NOT_FOUND",
                AuditError::Listing(_) => "LISTING_FAILED",
                AuditError::Fetch(_) => "FETCH_FAILED",
                AuditError::Classification(_) => "CLASSIFIER_UNAVAILABLE",
                AuditError::Http(_) => "UPSTREAM_ERROR",
                AuditError::Timeout(_) => "UPSTREAM_TIMEOUT",
                AuditError::Fingerprint(_) => "FINGERPRINT_ERROR",
                AuditError::Persistence(_) => "PERSISTENCE_ERROR",
                AuditError::RuleSet(_) => "RULE_SET_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        // Log based on severity, always including internal details
        if status.is_client_error() {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        } else {
            tracing::error!(status = %status, code, error = %message, "Server error");
        }

        // All error responses include a `code` field for programmatic handling
        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_rule_maps_to_bad_request() {
        let err = ApiError::from(AuditError::UnknownRule("rule_x".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "UNKNOWN_RULE");
    }

    #[test]
    fn collaborator_failures_map_to_service_unavailable() {
        let err = ApiError::from(AuditError::Listing("gateway down".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn persistence_failure_is_internal() {
        let err = ApiError::from(AuditError::Persistence("pool exhausted".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
