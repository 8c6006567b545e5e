//! Shared fixtures for fanvault-access-core integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fanvault_access_core::{AccessConfig, AccessService};
use fanvault_db::{MemoryStore, SubscriptionRepository, UpsertSubscription};
use fanvault_types::{
    Content, ContentId, Creator, CreatorId, SubscriptionStatus, SubscriptionTier, Tier, TierId,
    TIER_ORDER, UserId,
};

pub const MEDIA_BASE_URL: &str = "https://media.example.com";
pub const MEDIA_SECRET: &str = "test-media-signing-secret-0123456789abcdef";

/// A memory store with one seeded creator offering every tier
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub service: AccessService,
    pub creator: CreatorId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(AccessConfig::new(MEDIA_BASE_URL, MEDIA_SECRET))
    }

    pub fn with_config(config: AccessConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let repos = store.repositories();
        let service = AccessService::new(config, repos.content, repos.subscriptions).unwrap();
        let creator = seed_creator(&store);
        Self {
            store,
            service,
            creator,
        }
    }

    pub fn add_creator(&self) -> CreatorId {
        seed_creator(&self.store)
    }

    pub fn add_content(&self, creator: CreatorId, required_tier: Tier, is_free: bool) -> Content {
        self.add_content_at(creator, required_tier, is_free, Utc::now())
    }

    pub fn add_content_at(
        &self,
        creator: CreatorId,
        required_tier: Tier,
        is_free: bool,
        created_at: DateTime<Utc>,
    ) -> Content {
        let id = ContentId::new();
        let content = Content {
            id,
            creator_id: creator,
            title: format!("{} post", required_tier),
            description: None,
            media_key: format!("creators/{creator}/{id}.mp4"),
            required_tier,
            is_free,
            view_count: 0,
            created_at,
        };
        self.store.insert_content(content.clone());
        content
    }

    /// Subscribe `user` to `creator` at `tier` with the period ending at `period_end`
    pub async fn subscribe(
        &self,
        user: UserId,
        creator: CreatorId,
        tier: Tier,
        status: SubscriptionStatus,
        period_end: DateTime<Utc>,
    ) {
        self.store
            .upsert(UpsertSubscription {
                subscriber_id: user,
                creator_id: creator,
                tier_id: tier_id(creator, tier),
                status,
                current_period_start: period_end - chrono::Duration::days(30),
                current_period_end: period_end,
                external_billing_id: format!("sub_{user}_{creator}"),
            })
            .await
            .unwrap();
    }

    pub async fn subscribe_active(&self, user: UserId, creator: CreatorId, tier: Tier) {
        self.subscribe(
            user,
            creator,
            tier,
            SubscriptionStatus::Active,
            Utc::now() + chrono::Duration::days(30),
        )
        .await;
    }
}

pub fn short_view_window() -> AccessConfig {
    AccessConfig::new(MEDIA_BASE_URL, MEDIA_SECRET).with_view_dedup_window(Duration::from_secs(60))
}

/// Deterministic tier offering id per (creator, tier)
pub fn tier_id(creator: CreatorId, tier: Tier) -> TierId {
    let mut bytes = *creator.0.as_bytes();
    bytes[15] ^= tier.level() as u8 + 1;
    TierId(uuid::Uuid::from_bytes(bytes))
}

fn seed_creator(store: &MemoryStore) -> CreatorId {
    let creator = CreatorId::new();
    store.insert_creator(Creator {
        id: creator,
        display_name: "creator".to_string(),
        subscriber_count: 0,
    });
    for (i, tier) in TIER_ORDER.iter().enumerate() {
        store.insert_tier(SubscriptionTier {
            id: tier_id(creator, *tier),
            creator_id: creator,
            tier: *tier,
            price_cents: 500 * (i as i64 + 1),
            features: vec![],
        });
    }
    creator
}
