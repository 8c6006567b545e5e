//! Database connection pool

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::DbResult;

/// Database connection pool type alias
pub type DbPool = PgPool;

/// Pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum open connections
    pub max_connections: u32,
    /// Time to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    create_pool_with_options(database_url, PoolOptions::default()).await
}

/// Create a new database connection pool with explicit options
pub async fn create_pool_with_options(
    database_url: &str,
    options: PoolOptions,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(options.max_connections)
        .acquire_timeout(options.acquire_timeout)
        .connect(database_url)
        .await
}

/// Apply the bundled schema migrations
pub async fn run_migrations(pool: &DbPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
