//! Benchmarks for entitlement hot paths

use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fanvault_access_core::{decide, EntitlementEvaluator, MediaSigner};
use fanvault_db::{MemoryStore, SubscriptionRepository, UpsertSubscription};
use fanvault_types::{
    Content, ContentId, Creator, CreatorId, Subscription, SubscriptionId, SubscriptionStatus, Tier,
    TierId, UserId,
};

fn content(creator_id: CreatorId, required_tier: Tier) -> Content {
    Content {
        id: ContentId::new(),
        creator_id,
        title: "bench".to_string(),
        description: None,
        media_key: "creators/bench/clip.mp4".to_string(),
        required_tier,
        is_free: false,
        view_count: 0,
        created_at: Utc::now(),
    }
}

fn bench_decide(c: &mut Criterion) {
    let creator = CreatorId::new();
    let now = Utc::now();
    let sub = Subscription {
        id: SubscriptionId::new(),
        subscriber_id: UserId::new(),
        creator_id: creator,
        tier_id: TierId::new(),
        tier: Tier::Premium,
        status: SubscriptionStatus::Active,
        current_period_start: now - Duration::days(1),
        current_period_end: now + Duration::days(29),
        external_billing_id: "sub_bench".to_string(),
        created_at: now,
    };

    let mut group = c.benchmark_group("decide");
    for required in [Tier::Basic, Tier::Premium, Tier::Vip] {
        let item = content(creator, required);
        group.bench_with_input(BenchmarkId::new("required", required), &item, |b, item| {
            b.iter(|| decide(black_box(item), black_box(Some(&sub)), black_box(now)));
        });
    }
    group.finish();
}

fn bench_feed_scope(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let creator = CreatorId::new();
    let user = UserId::new();
    store.insert_creator(Creator {
        id: creator,
        display_name: "bench".to_string(),
        subscriber_count: 0,
    });
    runtime
        .block_on(store.upsert(UpsertSubscription {
            subscriber_id: user,
            creator_id: creator,
            tier_id: TierId::new(),
            status: SubscriptionStatus::Active,
            current_period_start: Utc::now(),
            current_period_end: Utc::now() + Duration::days(30),
            external_billing_id: "sub_bench".to_string(),
        }))
        .unwrap();

    let evaluator = EntitlementEvaluator::new(store);
    let items: Vec<Content> = (0..50).map(|_| content(creator, Tier::Basic)).collect();

    c.bench_function("feed_scope_50_items", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut scope = evaluator.scope(Some(user));
            for item in &items {
                black_box(scope.evaluate(item).await.unwrap());
            }
        });
    });
}

fn bench_media_signing(c: &mut Criterion) {
    let signer = MediaSigner::new(
        "https://media.example.com",
        "b".repeat(32),
        std::time::Duration::from_secs(3600),
    )
    .unwrap();
    let now = Utc::now();

    c.bench_function("media_sign", |b| {
        b.iter(|| signer.sign(black_box("creators/bench/clip.mp4"), now));
    });
}

criterion_group!(benches, bench_decide, bench_feed_scope, bench_media_signing);
criterion_main!(benches);
