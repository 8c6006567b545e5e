//! Content access behavior against the in-memory store

mod common;

use chrono::{Duration, Utc};
use common::{short_view_window, Fixture, MEDIA_BASE_URL};
use fanvault_access_core::{AccessError, ViewOutcome};
use fanvault_types::{AccessReason, ContentId, SubscriptionStatus, Tier, UserId};

#[tokio::test]
async fn free_content_is_visible_to_everyone() {
    let fx = Fixture::new();
    let item = fx.add_content(fx.creator, Tier::Vip, true);

    let anonymous = fx.service.get_feed_item(None, item.id).await.unwrap();
    assert!(anonymous.has_access);
    assert_eq!(anonymous.reason, AccessReason::Free);
    assert!(anonymous.media_url.is_some());

    // Free content needs no subscription lookup
    fx.store.set_unavailable(true);
    let decision = fx
        .service
        .evaluator()
        .can_access(Some(UserId::new()), &item)
        .await
        .unwrap();
    assert!(decision.granted);
}

#[tokio::test]
async fn anonymous_viewer_is_denied_paid_content() {
    let fx = Fixture::new();
    let item = fx.add_content(fx.creator, Tier::Basic, false);

    let view = fx.service.get_feed_item(None, item.id).await.unwrap();
    assert!(!view.has_access);
    assert_eq!(view.reason, AccessReason::NoSubscription);
    assert_eq!(view.media_url, None);
    assert_eq!(view.access_required, Some(Tier::Basic));
}

#[tokio::test]
async fn tiers_are_scoped_to_their_creator() {
    let fx = Fixture::new();
    let other_creator = fx.add_creator();
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Vip).await;

    let own_basic = fx.add_content(fx.creator, Tier::Basic, false);
    let other_vip = fx.add_content(other_creator, Tier::Vip, false);

    let granted = fx.service.get_feed_item(Some(user), own_basic.id).await.unwrap();
    assert!(granted.has_access);
    assert_eq!(granted.reason, AccessReason::TierSufficient);

    let denied = fx.service.get_feed_item(Some(user), other_vip.id).await.unwrap();
    assert!(!denied.has_access);
    assert_eq!(denied.reason, AccessReason::NoSubscription);
}

#[tokio::test]
async fn premium_subscriber_is_upsold_to_vip() {
    let fx = Fixture::new();
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Premium).await;

    let premium = fx.add_content(fx.creator, Tier::Premium, false);
    let vip = fx.add_content(fx.creator, Tier::Vip, false);

    let view = fx.service.get_feed_item(Some(user), premium.id).await.unwrap();
    assert!(view.has_access);
    let url = view.media_url.unwrap();
    assert!(url.starts_with(&format!("{MEDIA_BASE_URL}/{}", premium.media_key)));
    assert!(url.contains("expires=") && url.contains("sig="));

    let view = fx.service.get_feed_item(Some(user), vip.id).await.unwrap();
    assert!(!view.has_access);
    assert_eq!(view.reason, AccessReason::TierInsufficient);
    assert_eq!(view.access_required, Some(Tier::Vip));
}

#[tokio::test]
async fn lapsed_period_denies_despite_active_status() {
    let fx = Fixture::new();
    let user = UserId::new();
    fx.subscribe(
        user,
        fx.creator,
        Tier::Vip,
        SubscriptionStatus::Active,
        Utc::now() - Duration::hours(1),
    )
    .await;
    let item = fx.add_content(fx.creator, Tier::Basic, false);

    let view = fx.service.get_feed_item(Some(user), item.id).await.unwrap();
    assert!(!view.has_access);
    assert_eq!(view.reason, AccessReason::Expired);
}

#[tokio::test]
async fn past_due_denies_within_period() {
    let fx = Fixture::new();
    let user = UserId::new();
    fx.subscribe(
        user,
        fx.creator,
        Tier::Vip,
        SubscriptionStatus::PastDue,
        Utc::now() + Duration::days(10),
    )
    .await;
    let item = fx.add_content(fx.creator, Tier::Basic, false);

    let view = fx.service.get_feed_item(Some(user), item.id).await.unwrap();
    assert!(!view.has_access);
    assert_eq!(view.reason, AccessReason::NoSubscription);
}

#[tokio::test]
async fn store_outage_fails_closed() {
    let fx = Fixture::new();
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Vip).await;
    let item = fx.add_content(fx.creator, Tier::Basic, false);

    fx.store.set_unavailable(true);
    let err = fx
        .service
        .evaluator()
        .can_access(Some(user), &item)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unavailable"));

    let err = fx.service.get_feed_item(Some(user), item.id).await.unwrap_err();
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn unknown_content_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .service
        .get_feed_item(None, ContentId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::ContentNotFound));
}

#[tokio::test]
async fn feed_is_paged_newest_first_with_mixed_access() {
    let fx = Fixture::new();
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Basic).await;

    let now = Utc::now();
    let oldest = fx.add_content_at(fx.creator, Tier::Basic, false, now - Duration::hours(3));
    let middle = fx.add_content_at(fx.creator, Tier::Vip, false, now - Duration::hours(2));
    let newest = fx.add_content_at(fx.creator, Tier::Premium, true, now - Duration::hours(1));

    let first = fx
        .service
        .list_feed(Some(user), fx.service.page(Some(1), Some(2)))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, newest.id);
    assert!(first[0].has_access);
    assert_eq!(first[1].id, middle.id);
    assert!(!first[1].has_access);

    let second = fx
        .service
        .list_feed(Some(user), fx.service.page(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, oldest.id);
    assert!(second[0].has_access);
}

#[tokio::test]
async fn creator_feed_only_lists_that_creator() {
    let fx = Fixture::new();
    let other = fx.add_creator();
    fx.add_content(fx.creator, Tier::Basic, false);
    fx.add_content(other, Tier::Basic, false);

    let views = fx
        .service
        .list_creator_feed(None, other, fx.service.page(None, None))
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].creator_id, other);
}

#[tokio::test]
async fn views_count_once_per_window() {
    let fx = Fixture::with_config(short_view_window());
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Premium).await;
    let item = fx.add_content(fx.creator, Tier::Basic, false);

    let first = fx.service.record_view(Some(user), item.id).await.unwrap();
    assert_eq!(first, ViewOutcome::Counted(1));

    let repeat = fx.service.record_view(Some(user), item.id).await.unwrap();
    assert_eq!(repeat, ViewOutcome::Suppressed);

    let other_viewer = UserId::new();
    fx.subscribe_active(other_viewer, fx.creator, Tier::Basic).await;
    let other = fx.service.record_view(Some(other_viewer), item.id).await.unwrap();
    assert_eq!(other, ViewOutcome::Counted(2));
}

#[tokio::test]
async fn denied_views_are_not_counted() {
    let fx = Fixture::new();
    let item = fx.add_content(fx.creator, Tier::Vip, false);

    let err = fx.service.record_view(None, item.id).await.unwrap_err();
    match err {
        AccessError::AccessDenied {
            reason,
            required_tier,
        } => {
            assert_eq!(reason, AccessReason::NoSubscription);
            assert_eq!(required_tier, Tier::Vip);
        }
        other => panic!("expected denial, got {other:?}"),
    }

    // A later granted view starts from zero
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Vip).await;
    let outcome = fx.service.record_view(Some(user), item.id).await.unwrap();
    assert_eq!(outcome, ViewOutcome::Counted(1));
}

#[tokio::test]
async fn subscriptions_list_only_active() {
    let fx = Fixture::new();
    let other = fx.add_creator();
    let user = UserId::new();
    fx.subscribe_active(user, fx.creator, Tier::Premium).await;
    fx.subscribe(
        user,
        other,
        Tier::Basic,
        SubscriptionStatus::Cancelled,
        Utc::now() + Duration::days(3),
    )
    .await;

    let subs = fx.service.list_subscriptions(user).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].creator_id, fx.creator);
    assert_eq!(subs[0].tier, Tier::Premium);
}

#[tokio::test]
async fn concurrent_evaluations_are_independent() {
    let fx = Fixture::new();
    let item = fx.add_content(fx.creator, Tier::Premium, false);

    let mut viewers = Vec::new();
    for i in 0..16 {
        let user = UserId::new();
        let tier = if i % 2 == 0 { Tier::Vip } else { Tier::Basic };
        fx.subscribe_active(user, fx.creator, tier).await;
        viewers.push((user, tier));
    }

    let evaluator = fx.service.evaluator();
    let decisions = futures::future::join_all(
        viewers
            .iter()
            .map(|(user, _)| evaluator.can_access(Some(*user), &item)),
    )
    .await;

    for ((_, tier), decision) in viewers.iter().zip(decisions) {
        let decision = decision.unwrap();
        match tier {
            Tier::Vip => {
                assert!(decision.granted);
                assert_eq!(decision.reason, AccessReason::TierSufficient);
            }
            _ => {
                assert!(!decision.granted);
                assert_eq!(decision.reason, AccessReason::TierInsufficient);
            }
        }
    }
}
