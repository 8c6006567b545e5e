//! Billing errors

use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Webhook signature missing, malformed, stale, or wrong
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Payload is not a usable billing event
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Event names a subscriber, creator, or tier that cannot be resolved
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] fanvault_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Whether the sender should redeliver the event.
    ///
    /// Rejected input never becomes valid on retry; everything else may.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::InvalidSignature(_) | Self::MalformedEvent(_))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::UnresolvedReference(_) => "UNRESOLVED_REFERENCE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
