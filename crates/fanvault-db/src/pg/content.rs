//! PostgreSQL content repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use fanvault_types::{Content, ContentId, CreatorId};

use crate::error::{DbError, DbResult};
use crate::models::ContentRow;
use crate::repo::ContentRepository;

const SELECT_CONTENT: &str = r#"
    SELECT id, creator_id, title, description, media_key, required_tier,
           is_free, view_count, created_at
    FROM content
"#;

/// PostgreSQL content repository
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Create a new content repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find_by_id(&self, id: ContentId) -> DbResult<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!("{SELECT_CONTENT} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Content::from))
    }

    async fn list_recent(&self, offset: i64, limit: i64) -> DbResult<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "{SELECT_CONTENT} ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn list_by_creator(
        &self,
        creator_id: CreatorId,
        offset: i64,
        limit: i64,
    ) -> DbResult<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "{SELECT_CONTENT} WHERE creator_id = $1 ORDER BY created_at DESC, id DESC OFFSET $2 LIMIT $3"
        ))
        .bind(creator_id.0)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn increment_view_count(&self, id: ContentId) -> DbResult<i64> {
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE content SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        count.ok_or(DbError::NotFound)
    }
}
