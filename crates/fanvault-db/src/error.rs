//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Stored value could not be mapped to a domain type
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// Store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for repository operations
pub type DbResult<T> = Result<T, DbError>;
