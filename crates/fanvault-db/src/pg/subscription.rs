//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use fanvault_types::{CreatorId, StatusChange, Subscription, SubscriptionStatus, UserId};

use crate::error::{DbError, DbResult};
use crate::models::SubscriptionRow;
use crate::repo::{SubscriptionRepository, UpsertSubscription};

const SELECT_SUBSCRIPTION: &str = r#"
    SELECT s.id, s.subscriber_id, s.creator_id, s.tier_id, t.tier_type, s.status,
           s.current_period_start, s.current_period_end, s.external_billing_id, s.created_at
    FROM subscriptions s
    LEFT JOIN subscription_tiers t ON t.id = s.tier_id
"#;

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_external_id(
        tx: &mut Transaction<'_, Postgres>,
        external_billing_id: &str,
    ) -> DbResult<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{SELECT_SUBSCRIPTION} WHERE s.external_billing_id = $1"
        ))
        .bind(external_billing_id)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    async fn apply_subscriber_delta(
        tx: &mut Transaction<'_, Postgres>,
        change: &StatusChange,
    ) -> DbResult<()> {
        let delta = change.active_delta();
        if delta == 0 {
            return Ok(());
        }

        sqlx::query(
            "UPDATE creators SET subscriber_count = GREATEST(subscriber_count + $1, 0) WHERE id = $2",
        )
        .bind(delta)
        .bind(change.subscription.creator_id.0)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Lock the row with this billing reference and return its current status
    async fn lock_status(
        tx: &mut Transaction<'_, Postgres>,
        external_billing_id: &str,
    ) -> DbResult<Option<SubscriptionStatus>> {
        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM subscriptions WHERE external_billing_id = $1 FOR UPDATE",
        )
        .bind(external_billing_id)
        .fetch_optional(&mut **tx)
        .await?;

        status
            .map(|s| {
                s.parse::<SubscriptionStatus>()
                    .map_err(|e| DbError::InvalidData(e.to_string()))
            })
            .transpose()
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_active(
        &self,
        subscriber_id: UserId,
        creator_id: CreatorId,
    ) -> DbResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{SELECT_SUBSCRIPTION} WHERE s.subscriber_id = $1 AND s.creator_id = $2 AND s.status = 'active'"
        ))
        .bind(subscriber_id.0)
        .bind(creator_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_pair(
        &self,
        subscriber_id: UserId,
        creator_id: CreatorId,
    ) -> DbResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{SELECT_SUBSCRIPTION} WHERE s.subscriber_id = $1 AND s.creator_id = $2"
        ))
        .bind(subscriber_id.0)
        .bind(creator_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_billing_id: &str,
    ) -> DbResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{SELECT_SUBSCRIPTION} WHERE s.external_billing_id = $1"
        ))
        .bind(external_billing_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list_active(&self, subscriber_id: UserId) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{SELECT_SUBSCRIPTION} WHERE s.subscriber_id = $1 AND s.status = 'active' ORDER BY s.created_at DESC"
        ))
        .bind(subscriber_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<StatusChange> {
        let mut tx = self.pool.begin().await?;

        // The unique key decides the race: exactly one concurrent caller inserts.
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO subscriptions (id, subscriber_id, creator_id, tier_id, status,
                                       current_period_start, current_period_end, external_billing_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (subscriber_id, creator_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sub.subscriber_id.0)
        .bind(sub.creator_id.0)
        .bind(sub.tier_id.0)
        .bind(sub.status.as_str())
        .bind(sub.current_period_start)
        .bind(sub.current_period_end)
        .bind(&sub.external_billing_id)
        .fetch_optional(&mut *tx)
        .await?;

        let previous = if inserted.is_some() {
            None
        } else {
            let previous: String = sqlx::query_scalar(
                "SELECT status FROM subscriptions WHERE subscriber_id = $1 AND creator_id = $2 FOR UPDATE",
            )
            .bind(sub.subscriber_id.0)
            .bind(sub.creator_id.0)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE subscriptions
                SET tier_id = $3, status = $4, current_period_start = $5,
                    current_period_end = $6, external_billing_id = $7,
                    canceled_at = CASE WHEN $4 = 'canceled' THEN COALESCE(canceled_at, NOW()) ELSE NULL END,
                    updated_at = NOW()
                WHERE subscriber_id = $1 AND creator_id = $2
                "#,
            )
            .bind(sub.subscriber_id.0)
            .bind(sub.creator_id.0)
            .bind(sub.tier_id.0)
            .bind(sub.status.as_str())
            .bind(sub.current_period_start)
            .bind(sub.current_period_end)
            .bind(&sub.external_billing_id)
            .execute(&mut *tx)
            .await?;

            Some(
                previous
                    .parse::<SubscriptionStatus>()
                    .map_err(|e| DbError::InvalidData(e.to_string()))?,
            )
        };

        let subscription = Self::fetch_by_external_id(&mut tx, &sub.external_billing_id).await?;
        let change = StatusChange {
            previous,
            subscription,
        };
        Self::apply_subscriber_delta(&mut tx, &change).await?;

        tx.commit().await?;
        Ok(change)
    }

    async fn set_status(
        &self,
        external_billing_id: &str,
        status: SubscriptionStatus,
    ) -> DbResult<Option<StatusChange>> {
        let mut tx = self.pool.begin().await?;

        let Some(previous) = Self::lock_status(&mut tx, external_billing_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2,
                canceled_at = CASE WHEN $2 = 'canceled' THEN COALESCE(canceled_at, NOW()) ELSE NULL END,
                updated_at = NOW()
            WHERE external_billing_id = $1
            "#,
        )
        .bind(external_billing_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        let subscription = Self::fetch_by_external_id(&mut tx, external_billing_id).await?;
        let change = StatusChange {
            previous: Some(previous),
            subscription,
        };
        Self::apply_subscriber_delta(&mut tx, &change).await?;

        tx.commit().await?;
        Ok(Some(change))
    }

    async fn update_from_billing(
        &self,
        external_billing_id: &str,
        status: SubscriptionStatus,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DbResult<Option<StatusChange>> {
        let mut tx = self.pool.begin().await?;

        let Some(previous) = Self::lock_status(&mut tx, external_billing_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, current_period_start = $3, current_period_end = $4,
                canceled_at = CASE WHEN $2 = 'canceled' THEN COALESCE(canceled_at, NOW()) ELSE NULL END,
                updated_at = NOW()
            WHERE external_billing_id = $1
            "#,
        )
        .bind(external_billing_id)
        .bind(status.as_str())
        .bind(period_start)
        .bind(period_end)
        .execute(&mut *tx)
        .await?;

        let subscription = Self::fetch_by_external_id(&mut tx, external_billing_id).await?;
        let change = StatusChange {
            previous: Some(previous),
            subscription,
        };
        Self::apply_subscriber_delta(&mut tx, &change).await?;

        tx.commit().await?;
        Ok(Some(change))
    }
}
