//! Access errors

use fanvault_types::{AccessReason, Tier};
use thiserror::Error;

use crate::crypto::HmacKeyError;

/// Raised by the entitlement evaluator.
///
/// A failed subscription lookup is never turned into a grant.
#[derive(Error, Debug, Clone)]
pub enum EvaluationError {
    /// Subscription record store could not be consulted
    #[error("entitlement evaluation unavailable: {0}")]
    Unavailable(String),
}

impl From<fanvault_db::DbError> for EvaluationError {
    fn from(err: fanvault_db::DbError) -> Self {
        tracing::error!(error = %err, "Subscription lookup failed during evaluation");
        Self::Unavailable(err.to_string())
    }
}

/// Content access errors
#[derive(Error, Debug)]
pub enum AccessError {
    /// Content item does not exist
    #[error("content not found")]
    ContentNotFound,

    /// Caller is not entitled to the content
    #[error("access denied: {reason}")]
    AccessDenied {
        reason: AccessReason,
        required_tier: Tier,
    },

    /// Entitlement could not be evaluated
    #[error(transparent)]
    EvaluationUnavailable(#[from] EvaluationError),

    /// Media signing secret rejected at startup
    #[error("invalid media signing key: {0}")]
    InvalidSigningKey(#[from] HmacKeyError),

    /// Content store error
    #[error("database error: {0}")]
    Database(String),
}

impl AccessError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ContentNotFound => 404,
            Self::AccessDenied { .. } => 403,
            Self::EvaluationUnavailable(_) | Self::Database(_) => 503,
            Self::InvalidSigningKey(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ContentNotFound => "CONTENT_NOT_FOUND",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::EvaluationUnavailable(_) | Self::Database(_) => "SERVICE_UNAVAILABLE",
            Self::InvalidSigningKey(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<fanvault_db::DbError> for AccessError {
    fn from(err: fanvault_db::DbError) -> Self {
        match err {
            fanvault_db::DbError::NotFound => Self::ContentNotFound,
            other => {
                tracing::error!("Database error: {}", other);
                Self::Database(other.to_string())
            }
        }
    }
}
