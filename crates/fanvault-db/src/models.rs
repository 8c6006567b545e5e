//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive,
//! and convert into the domain types from `fanvault-types`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use fanvault_types::{
    Content, ContentId, Creator, CreatorId, Subscription, SubscriptionId, SubscriptionStatus,
    SubscriptionTier, Tier, TierId, UserId,
};

use crate::{DbError, DbResult};

/// Subscription row joined with its tier offering
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub creator_id: Uuid,
    pub tier_id: Uuid,
    /// `None` when the tier offering no longer exists
    pub tier_type: Option<String>,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub external_billing_id: String,
    pub created_at: DateTime<Utc>,
}

/// Tier offering row
#[derive(Debug, Clone, FromRow)]
pub struct TierRow {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub tier_type: String,
    pub price_cents: i64,
    pub features: Vec<String>,
}

/// Creator row
#[derive(Debug, Clone, FromRow)]
pub struct CreatorRow {
    pub id: Uuid,
    pub display_name: String,
    pub subscriber_count: i64,
}

/// Content row
#[derive(Debug, Clone, FromRow)]
pub struct ContentRow {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub media_key: String,
    pub required_tier: String,
    pub is_free: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DbError;

    fn try_from(row: SubscriptionRow) -> DbResult<Self> {
        let status: SubscriptionStatus = row
            .status
            .parse()
            .map_err(|e: fanvault_types::ParseError| DbError::InvalidData(e.to_string()))?;

        let tier = match row.tier_type.as_deref().map(str::parse::<Tier>) {
            Some(Ok(tier)) => tier,
            other => {
                tracing::warn!(
                    subscription_id = %row.id,
                    tier_id = %row.tier_id,
                    tier_type = ?row.tier_type,
                    missing = other.is_none(),
                    "Unrecognized tier on subscription, resolving to lowest tier"
                );
                Tier::lowest()
            }
        };

        Ok(Self {
            id: SubscriptionId(row.id),
            subscriber_id: UserId(row.subscriber_id),
            creator_id: CreatorId(row.creator_id),
            tier_id: TierId(row.tier_id),
            tier,
            status,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            external_billing_id: row.external_billing_id,
            created_at: row.created_at,
        })
    }
}

impl From<TierRow> for SubscriptionTier {
    fn from(row: TierRow) -> Self {
        let tier = row.tier_type.parse().unwrap_or_else(|_| {
            tracing::warn!(tier_id = %row.id, tier_type = %row.tier_type, "Unrecognized tier type");
            Tier::lowest()
        });

        Self {
            id: TierId(row.id),
            creator_id: CreatorId(row.creator_id),
            tier,
            price_cents: row.price_cents,
            features: row.features,
        }
    }
}

impl From<CreatorRow> for Creator {
    fn from(row: CreatorRow) -> Self {
        Self {
            id: CreatorId(row.id),
            display_name: row.display_name,
            subscriber_count: row.subscriber_count,
        }
    }
}

impl From<ContentRow> for Content {
    fn from(row: ContentRow) -> Self {
        let required_tier = row.required_tier.parse().unwrap_or_else(|_| {
            tracing::warn!(
                content_id = %row.id,
                required_tier = %row.required_tier,
                "Unrecognized required tier, resolving to highest tier"
            );
            Tier::highest()
        });

        Self {
            id: ContentId(row.id),
            creator_id: CreatorId(row.creator_id),
            title: row.title,
            description: row.description,
            media_key: row.media_key,
            required_tier,
            is_free: row.is_free,
            view_count: row.view_count,
            created_at: row.created_at,
        }
    }
}
