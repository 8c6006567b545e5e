//! PostgreSQL processed billing event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::repo::ProcessedEventRepository;

/// PostgreSQL processed event repository
#[derive(Clone)]
pub struct PgProcessedEventRepository {
    pool: PgPool,
}

impl PgProcessedEventRepository {
    /// Create a new processed event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventRepository for PgProcessedEventRepository {
    async fn claim(&self, event_id: &str, event_type: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, event_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM processed_events WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM processed_events WHERE processed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
