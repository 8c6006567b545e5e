//! PostgreSQL creator repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use fanvault_types::{Creator, CreatorId};

use crate::error::DbResult;
use crate::models::CreatorRow;
use crate::repo::CreatorRepository;

/// PostgreSQL creator repository
#[derive(Clone)]
pub struct PgCreatorRepository {
    pool: PgPool,
}

impl PgCreatorRepository {
    /// Create a new creator repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreatorRepository for PgCreatorRepository {
    async fn find_by_id(&self, id: CreatorId) -> DbResult<Option<Creator>> {
        let row = sqlx::query_as::<_, CreatorRow>(
            "SELECT id, display_name, subscriber_count FROM creators WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Creator::from))
    }
}
