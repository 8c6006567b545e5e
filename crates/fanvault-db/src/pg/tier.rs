//! PostgreSQL tier offering repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use fanvault_types::{CreatorId, SubscriptionTier, TierId};

use crate::error::DbResult;
use crate::models::TierRow;
use crate::repo::TierRepository;

/// PostgreSQL tier offering repository
#[derive(Clone)]
pub struct PgTierRepository {
    pool: PgPool,
}

impl PgTierRepository {
    /// Create a new tier repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TierRepository for PgTierRepository {
    async fn find_by_id(&self, id: TierId) -> DbResult<Option<SubscriptionTier>> {
        let row = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, creator_id, tier_type, price_cents, features
            FROM subscription_tiers
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SubscriptionTier::from))
    }

    async fn find_by_creator(&self, creator_id: CreatorId) -> DbResult<Vec<SubscriptionTier>> {
        let rows = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, creator_id, tier_type, price_cents, features
            FROM subscription_tiers
            WHERE creator_id = $1
            ORDER BY price_cents ASC
            "#,
        )
        .bind(creator_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SubscriptionTier::from).collect())
    }
}
