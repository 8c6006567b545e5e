//! Error types for the platform API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use fanvault_access_core::AccessError;
use fanvault_billing_core::BillingError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Access(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Billing(e) if e.is_retriable() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Billing(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Access(e) => e.error_code(),
            Self::Billing(e) => e.error_code(),
        }
    }

    /// Message safe to show callers; store faults stay in the logs
    fn public_message(&self) -> String {
        match self {
            Self::Access(AccessError::EvaluationUnavailable(_) | AccessError::Database(_)) => {
                "Service temporarily unavailable, please try again".to_string()
            }
            Self::Access(AccessError::InvalidSigningKey(_)) => "Internal error".to_string(),
            Self::Billing(e) if e.is_retriable() => "Event not processed, retry later".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Access(AccessError::AccessDenied {
                reason,
                required_tier,
            }) => Some(serde_json::json!({
                "reason": reason,
                "requiredTier": required_tier,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Internal API error");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
