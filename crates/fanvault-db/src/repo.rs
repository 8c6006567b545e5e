//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fanvault_types::{
    Content, ContentId, Creator, CreatorId, StatusChange, Subscription, SubscriptionStatus,
    SubscriptionTier, TierId, UserId,
};

use crate::error::DbResult;

/// Subscription record store
///
/// Every write that changes whether a subscription is Active adjusts the
/// owning creator's `subscriber_count` by [`StatusChange::active_delta`]
/// in the same transaction.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the Active subscription for a (subscriber, creator) pair
    async fn find_active(
        &self,
        subscriber_id: UserId,
        creator_id: CreatorId,
    ) -> DbResult<Option<Subscription>>;

    /// Find the subscription for a pair in any status
    async fn find_by_pair(
        &self,
        subscriber_id: UserId,
        creator_id: CreatorId,
    ) -> DbResult<Option<Subscription>>;

    /// Find a subscription by its upstream billing reference
    async fn find_by_external_id(&self, external_billing_id: &str)
        -> DbResult<Option<Subscription>>;

    /// All Active subscriptions held by a subscriber
    async fn list_active(&self, subscriber_id: UserId) -> DbResult<Vec<Subscription>>;

    /// Insert or update the row for (subscriber, creator).
    ///
    /// Concurrent calls for the same pair resolve to updates, never to a
    /// duplicate-key error.
    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<StatusChange>;

    /// Set the status of the row with this billing reference.
    ///
    /// Returns `None`, without error, when no row matches.
    async fn set_status(
        &self,
        external_billing_id: &str,
        status: SubscriptionStatus,
    ) -> DbResult<Option<StatusChange>>;

    /// Overwrite status and period window of the row with this billing reference.
    ///
    /// Returns `None`, without error, when no row matches.
    async fn update_from_billing(
        &self,
        external_billing_id: &str,
        status: SubscriptionStatus,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DbResult<Option<StatusChange>>;
}

/// Upsert subscription input
#[derive(Debug, Clone)]
pub struct UpsertSubscription {
    pub subscriber_id: UserId,
    pub creator_id: CreatorId,
    pub tier_id: TierId,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub external_billing_id: String,
}

/// Tier offering repository trait
#[async_trait]
pub trait TierRepository: Send + Sync {
    /// Find a tier offering by ID
    async fn find_by_id(&self, id: TierId) -> DbResult<Option<SubscriptionTier>>;

    /// All tier offerings of a creator
    async fn find_by_creator(&self, creator_id: CreatorId) -> DbResult<Vec<SubscriptionTier>>;
}

/// Creator repository trait
#[async_trait]
pub trait CreatorRepository: Send + Sync {
    /// Find a creator by ID
    async fn find_by_id(&self, id: CreatorId) -> DbResult<Option<Creator>>;
}

/// Content repository trait
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Find a content item by ID
    async fn find_by_id(&self, id: ContentId) -> DbResult<Option<Content>>;

    /// Newest content across all creators
    async fn list_recent(&self, offset: i64, limit: i64) -> DbResult<Vec<Content>>;

    /// Newest content of one creator
    async fn list_by_creator(
        &self,
        creator_id: CreatorId,
        offset: i64,
        limit: i64,
    ) -> DbResult<Vec<Content>>;

    /// Count one view, returning the new total
    async fn increment_view_count(&self, id: ContentId) -> DbResult<i64>;
}

/// Processed billing event repository trait
#[async_trait]
pub trait ProcessedEventRepository: Send + Sync {
    /// Record an event as processed.
    ///
    /// Returns `false` when the event was already recorded. Insert-if-absent
    /// is atomic.
    async fn claim(&self, event_id: &str, event_type: &str) -> DbResult<bool>;

    /// Forget an event so a redelivery is processed again
    async fn release(&self, event_id: &str) -> DbResult<()>;

    /// Delete records older than the cutoff
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;
}
