//! Common error types

use thiserror::Error;

/// Errors parsing stored or wire values into domain types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unrecognized tier name
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    /// Unrecognized subscription status
    #[error("invalid subscription status: {0}")]
    InvalidStatus(String),
}
