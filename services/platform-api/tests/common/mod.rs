//! Router fixture over the in-memory store

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use fanvault_db::{MemoryStore, SubscriptionRepository, UpsertSubscription};
use fanvault_types::{
    Content, ContentId, Creator, CreatorId, SubscriptionStatus, SubscriptionTier, Tier, TierId,
    UserId,
};
use platform_api::{build_router, AppState, Config};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_platform_api_tests";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    pub creator: CreatorId,
}

impl TestApp {
    pub fn new() -> Self {
        let vars = [
            ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
            ("MEDIA_BASE_URL", "https://media.example.com"),
            ("MEDIA_SIGNING_SECRET", "platform-api-tests-media-secret-0123456789"),
        ];
        let config = Config::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, &store.repositories(), None).unwrap();
        let router = build_router(state, None);

        let creator = CreatorId::new();
        store.insert_creator(Creator {
            id: creator,
            display_name: "creator".to_string(),
            subscriber_count: 0,
        });

        Self {
            store,
            router,
            creator,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn add_tier(&self, tier: Tier) -> TierId {
        let id = TierId::new();
        self.store.insert_tier(SubscriptionTier {
            id,
            creator_id: self.creator,
            tier,
            price_cents: 500,
            features: vec![],
        });
        id
    }

    pub fn add_content(&self, required_tier: Tier, is_free: bool) -> Content {
        let content = Content {
            id: ContentId::new(),
            creator_id: self.creator,
            title: format!("{required_tier} item"),
            description: None,
            media_key: format!("media/{}.jpg", uuid::Uuid::new_v4()),
            required_tier,
            is_free,
            view_count: 0,
            created_at: Utc::now(),
        };
        self.store.insert_content(content.clone());
        content
    }

    pub async fn subscribe(&self, user: UserId, tier: Tier) {
        let tier_id = self.add_tier(tier);
        self.store
            .upsert(UpsertSubscription {
                subscriber_id: user,
                creator_id: self.creator,
                tier_id,
                status: SubscriptionStatus::Active,
                current_period_start: Utc::now() - Duration::days(1),
                current_period_end: Utc::now() + Duration::days(29),
                external_billing_id: format!("sub_{}", uuid::Uuid::new_v4().simple()),
            })
            .await
            .unwrap();
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn get(uri: &str, user: Option<UserId>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post(uri: &str, user: Option<UserId>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    builder.body(Body::empty()).unwrap()
}
