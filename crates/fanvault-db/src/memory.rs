//! In-memory repository implementations
//!
//! Backs local development when no `DATABASE_URL` is configured, and the
//! service-level test suites. Writes that touch a subscription hold the
//! entry for its (subscriber, creator) pair for the whole update, so
//! concurrent upserts of one pair serialize the same way row locks do in
//! PostgreSQL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use fanvault_types::{
    Content, ContentId, Creator, CreatorId, StatusChange, Subscription, SubscriptionId,
    SubscriptionStatus, SubscriptionTier, Tier, TierId, UserId,
};

use crate::error::{DbError, DbResult};
use crate::pg::Repositories;
use crate::repo::{
    ContentRepository, CreatorRepository, ProcessedEventRepository, SubscriptionRepository,
    TierRepository, UpsertSubscription,
};

type PairKey = (UserId, CreatorId);

/// Process-local store implementing every repository trait
#[derive(Default)]
pub struct MemoryStore {
    creators: DashMap<CreatorId, Creator>,
    tiers: DashMap<TierId, SubscriptionTier>,
    subscriptions: DashMap<PairKey, Subscription>,
    by_external_id: DashMap<String, PairKey>,
    content: DashMap<ContentId, Content>,
    processed_events: DashMap<String, DateTime<Utc>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`DbError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert or replace a creator
    pub fn insert_creator(&self, creator: Creator) {
        self.creators.insert(creator.id, creator);
    }

    /// Insert or replace a tier offering
    pub fn insert_tier(&self, tier: SubscriptionTier) {
        self.tiers.insert(tier.id, tier);
    }

    /// Insert or replace a content item
    pub fn insert_content(&self, content: Content) {
        self.content.insert(content.id, content);
    }

    /// Current subscriber count of a creator
    pub fn subscriber_count(&self, creator_id: CreatorId) -> Option<i64> {
        self.creators.get(&creator_id).map(|c| c.subscriber_count)
    }

    /// Number of stored subscription rows
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Bundle this store as the full repository set
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            subscriptions: self.clone(),
            tiers: self.clone(),
            creators: self.clone(),
            content: self.clone(),
            events: self.clone(),
        }
    }

    fn check_available(&self) -> DbResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    /// Resolve the tier of a stored row the way the SQL join does
    fn hydrate(&self, mut sub: Subscription) -> Subscription {
        sub.tier = self
            .tiers
            .get(&sub.tier_id)
            .map(|t| t.tier)
            .unwrap_or_else(Tier::lowest);
        sub
    }

    fn apply_subscriber_delta(&self, change: &StatusChange) {
        let delta = change.active_delta();
        if delta == 0 {
            return;
        }
        if let Some(mut creator) = self.creators.get_mut(&change.subscription.creator_id) {
            creator.subscriber_count = (creator.subscriber_count + delta).max(0);
        }
    }

    fn update_by_external_id(
        &self,
        external_billing_id: &str,
        apply: impl FnOnce(&mut Subscription),
    ) -> DbResult<Option<StatusChange>> {
        self.check_available()?;

        let Some(key) = self.by_external_id.get(external_billing_id).map(|k| *k.value()) else {
            return Ok(None);
        };
        let Some(mut row) = self.subscriptions.get_mut(&key) else {
            return Ok(None);
        };

        let previous = row.status;
        apply(&mut row);

        let change = StatusChange {
            previous: Some(previous),
            subscription: self.hydrate(row.clone()),
        };
        self.apply_subscriber_delta(&change);
        Ok(Some(change))
    }

    fn page<T: Clone>(mut items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        items.drain(..offset.min(items.len()));
        items.truncate(limit);
        items
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find_active(
        &self,
        subscriber_id: UserId,
        creator_id: CreatorId,
    ) -> DbResult<Option<Subscription>> {
        self.check_available()?;
        Ok(self
            .subscriptions
            .get(&(subscriber_id, creator_id))
            .filter(|s| s.status.is_active())
            .map(|s| self.hydrate(s.value().clone())))
    }

    async fn find_by_pair(
        &self,
        subscriber_id: UserId,
        creator_id: CreatorId,
    ) -> DbResult<Option<Subscription>> {
        self.check_available()?;
        Ok(self
            .subscriptions
            .get(&(subscriber_id, creator_id))
            .map(|s| self.hydrate(s.value().clone())))
    }

    async fn find_by_external_id(
        &self,
        external_billing_id: &str,
    ) -> DbResult<Option<Subscription>> {
        self.check_available()?;
        let Some(key) = self.by_external_id.get(external_billing_id).map(|k| *k.value()) else {
            return Ok(None);
        };
        Ok(self
            .subscriptions
            .get(&key)
            .map(|s| self.hydrate(s.value().clone())))
    }

    async fn list_active(&self, subscriber_id: UserId) -> DbResult<Vec<Subscription>> {
        self.check_available()?;
        let mut subs: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id && s.status.is_active())
            .map(|s| s.value().clone())
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs.into_iter().map(|s| self.hydrate(s)).collect())
    }

    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<StatusChange> {
        self.check_available()?;

        let key = (sub.subscriber_id, sub.creator_id);
        let (previous, stored) = match self.subscriptions.entry(key) {
            Entry::Occupied(mut entry) => {
                let row = entry.get_mut();
                let previous = row.status;
                if row.external_billing_id != sub.external_billing_id {
                    self.by_external_id.remove(&row.external_billing_id);
                }
                row.tier_id = sub.tier_id;
                row.status = sub.status;
                row.current_period_start = sub.current_period_start;
                row.current_period_end = sub.current_period_end;
                row.external_billing_id = sub.external_billing_id.clone();
                self.by_external_id.insert(sub.external_billing_id, key);
                (Some(previous), row.clone())
            }
            Entry::Vacant(entry) => {
                let row = Subscription {
                    id: SubscriptionId::new(),
                    subscriber_id: sub.subscriber_id,
                    creator_id: sub.creator_id,
                    tier_id: sub.tier_id,
                    tier: Tier::lowest(),
                    status: sub.status,
                    current_period_start: sub.current_period_start,
                    current_period_end: sub.current_period_end,
                    external_billing_id: sub.external_billing_id.clone(),
                    created_at: Utc::now(),
                };
                self.by_external_id.insert(sub.external_billing_id, key);
                (None, entry.insert(row).clone())
            }
        };

        let change = StatusChange {
            previous,
            subscription: self.hydrate(stored),
        };
        self.apply_subscriber_delta(&change);
        Ok(change)
    }

    async fn set_status(
        &self,
        external_billing_id: &str,
        status: SubscriptionStatus,
    ) -> DbResult<Option<StatusChange>> {
        self.update_by_external_id(external_billing_id, |row| row.status = status)
    }

    async fn update_from_billing(
        &self,
        external_billing_id: &str,
        status: SubscriptionStatus,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DbResult<Option<StatusChange>> {
        self.update_by_external_id(external_billing_id, |row| {
            row.status = status;
            row.current_period_start = period_start;
            row.current_period_end = period_end;
        })
    }
}

#[async_trait]
impl TierRepository for MemoryStore {
    async fn find_by_id(&self, id: TierId) -> DbResult<Option<SubscriptionTier>> {
        self.check_available()?;
        Ok(self.tiers.get(&id).map(|t| t.value().clone()))
    }

    async fn find_by_creator(&self, creator_id: CreatorId) -> DbResult<Vec<SubscriptionTier>> {
        self.check_available()?;
        let mut tiers: Vec<SubscriptionTier> = self
            .tiers
            .iter()
            .filter(|t| t.creator_id == creator_id)
            .map(|t| t.value().clone())
            .collect();
        tiers.sort_by_key(|t| t.price_cents);
        Ok(tiers)
    }
}

#[async_trait]
impl CreatorRepository for MemoryStore {
    async fn find_by_id(&self, id: CreatorId) -> DbResult<Option<Creator>> {
        self.check_available()?;
        Ok(self.creators.get(&id).map(|c| c.value().clone()))
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn find_by_id(&self, id: ContentId) -> DbResult<Option<Content>> {
        self.check_available()?;
        Ok(self.content.get(&id).map(|c| c.value().clone()))
    }

    async fn list_recent(&self, offset: i64, limit: i64) -> DbResult<Vec<Content>> {
        self.check_available()?;
        let mut items: Vec<Content> = self.content.iter().map(|c| c.value().clone()).collect();
        items.sort_by(|a, b| (b.created_at, b.id.0).cmp(&(a.created_at, a.id.0)));
        Ok(Self::page(items, offset, limit))
    }

    async fn list_by_creator(
        &self,
        creator_id: CreatorId,
        offset: i64,
        limit: i64,
    ) -> DbResult<Vec<Content>> {
        self.check_available()?;
        let mut items: Vec<Content> = self
            .content
            .iter()
            .filter(|c| c.creator_id == creator_id)
            .map(|c| c.value().clone())
            .collect();
        items.sort_by(|a, b| (b.created_at, b.id.0).cmp(&(a.created_at, a.id.0)));
        Ok(Self::page(items, offset, limit))
    }

    async fn increment_view_count(&self, id: ContentId) -> DbResult<i64> {
        self.check_available()?;
        let mut content = self.content.get_mut(&id).ok_or(DbError::NotFound)?;
        content.view_count += 1;
        Ok(content.view_count)
    }
}

#[async_trait]
impl ProcessedEventRepository for MemoryStore {
    async fn claim(&self, event_id: &str, _event_type: &str) -> DbResult<bool> {
        self.check_available()?;
        match self.processed_events.entry(event_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(Utc::now());
                Ok(true)
            }
        }
    }

    async fn release(&self, event_id: &str) -> DbResult<()> {
        self.check_available()?;
        self.processed_events.remove(event_id);
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        self.check_available()?;
        let before = self.processed_events.len();
        self.processed_events.retain(|_, processed_at| *processed_at >= cutoff);
        Ok(before.saturating_sub(self.processed_events.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seeded() -> (Arc<MemoryStore>, CreatorId, TierId) {
        let store = Arc::new(MemoryStore::new());
        let creator_id = CreatorId::new();
        let tier_id = TierId::new();
        store.insert_creator(Creator {
            id: creator_id,
            display_name: "creator".to_string(),
            subscriber_count: 0,
        });
        store.insert_tier(SubscriptionTier {
            id: tier_id,
            creator_id,
            tier: Tier::Premium,
            price_cents: 999,
            features: vec![],
        });
        (store, creator_id, tier_id)
    }

    fn upsert_input(
        subscriber_id: UserId,
        creator_id: CreatorId,
        tier_id: TierId,
        external: &str,
    ) -> UpsertSubscription {
        let now = Utc::now();
        UpsertSubscription {
            subscriber_id,
            creator_id,
            tier_id,
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: now + Duration::days(30),
            external_billing_id: external.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let (store, creator_id, tier_id) = seeded();
        let user = UserId::new();

        let first = store
            .upsert(upsert_input(user, creator_id, tier_id, "sub_1"))
            .await
            .unwrap();
        assert_eq!(first.previous, None);
        assert_eq!(first.subscription.tier, Tier::Premium);

        let second = store
            .upsert(upsert_input(user, creator_id, tier_id, "sub_2"))
            .await
            .unwrap();
        assert_eq!(second.previous, Some(SubscriptionStatus::Active));
        assert_eq!(second.subscription.id, first.subscription.id);

        assert_eq!(store.subscription_count(), 1);
        assert_eq!(store.subscriber_count(creator_id), Some(1));
        assert!(store.find_by_external_id("sub_1").await.unwrap().is_none());
        assert!(store.find_by_external_id("sub_2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_create_one_row() {
        let (store, creator_id, tier_id) = seeded();
        let user = UserId::new();

        let tasks = (0..16).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert(upsert_input(user, creator_id, tier_id, &format!("sub_{i}")))
                    .await
            })
        });

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(store.subscription_count(), 1);
        assert_eq!(store.subscriber_count(creator_id), Some(1));
    }

    #[tokio::test]
    async fn test_status_changes_adjust_subscriber_count() {
        let (store, creator_id, tier_id) = seeded();
        store
            .upsert(upsert_input(UserId::new(), creator_id, tier_id, "sub_1"))
            .await
            .unwrap();

        let change = store
            .set_status("sub_1", SubscriptionStatus::PastDue)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, Some(SubscriptionStatus::Active));
        assert_eq!(store.subscriber_count(creator_id), Some(0));

        // Repeating a non-active status does not decrement twice
        store
            .set_status("sub_1", SubscriptionStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(store.subscriber_count(creator_id), Some(0));

        let start = Utc::now();
        store
            .update_from_billing("sub_1", SubscriptionStatus::Active, start, start + Duration::days(30))
            .await
            .unwrap();
        assert_eq!(store.subscriber_count(creator_id), Some(1));
    }

    #[tokio::test]
    async fn test_unknown_billing_reference_is_not_an_error() {
        let (store, _, _) = seeded();
        let result = store
            .set_status("sub_missing", SubscriptionStatus::Cancelled)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_active_ignores_other_statuses() {
        let (store, creator_id, tier_id) = seeded();
        let user = UserId::new();
        store
            .upsert(upsert_input(user, creator_id, tier_id, "sub_1"))
            .await
            .unwrap();
        store
            .set_status("sub_1", SubscriptionStatus::PastDue)
            .await
            .unwrap();

        assert!(store.find_active(user, creator_id).await.unwrap().is_none());
        assert!(store.find_by_pair(user, creator_id).await.unwrap().is_some());
        assert!(store.list_active(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tier_resolves_to_lowest() {
        let (store, creator_id, _) = seeded();
        let user = UserId::new();
        let change = store
            .upsert(upsert_input(user, creator_id, TierId::new(), "sub_1"))
            .await
            .unwrap();
        assert_eq!(change.subscription.tier, Tier::Basic);
    }

    #[tokio::test]
    async fn test_claim_is_insert_if_absent() {
        let store = MemoryStore::new();
        assert!(store.claim("evt_1", "invoice.paid").await.unwrap());
        assert!(!store.claim("evt_1", "invoice.paid").await.unwrap());

        store.release("evt_1").await.unwrap();
        assert!(store.claim("evt_1", "invoice.paid").await.unwrap());

        let purged = store
            .purge_older_than(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let (store, creator_id, _) = seeded();
        store.set_unavailable(true);
        let err = store
            .find_active(UserId::new(), creator_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_content_listing_is_newest_first() {
        let store = MemoryStore::new();
        let creator_id = CreatorId::new();
        let now = Utc::now();
        for i in 0..5 {
            store.insert_content(Content {
                id: ContentId::new(),
                creator_id,
                title: format!("post {i}"),
                description: None,
                media_key: format!("media/{i}"),
                required_tier: Tier::Basic,
                is_free: false,
                view_count: 0,
                created_at: now - Duration::minutes(i),
            });
        }

        let page = store.list_recent(1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "post 1");
        assert_eq!(page[1].title, "post 2");

        let rest = store.list_by_creator(creator_id, 4, 10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].title, "post 4");

        let count = store.increment_view_count(page[0].id).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_tiers_by_creator_sorted_by_price() {
        let (store, creator_id, premium) = seeded();
        let vip = TierId::new();
        let basic = TierId::new();
        for (id, creator, tier, price_cents) in [
            (vip, creator_id, Tier::Vip, 2999),
            (basic, creator_id, Tier::Basic, 499),
            (TierId::new(), CreatorId::new(), Tier::Basic, 99),
        ] {
            store.insert_tier(SubscriptionTier {
                id,
                creator_id: creator,
                tier,
                price_cents,
                features: vec![],
            });
        }

        let tiers = store.find_by_creator(creator_id).await.unwrap();
        let ids: Vec<TierId> = tiers.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![basic, premium, vip]);

        store.set_unavailable(true);
        assert!(store.find_by_creator(creator_id).await.is_err());
    }
}
