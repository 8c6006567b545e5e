//! Entitlement evaluation
//!
//! [`decide`] is the pure rule set. [`EntitlementEvaluator`] pairs it with a
//! subscription lookup and never turns a failed lookup into a grant.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use fanvault_db::SubscriptionRepository;
use fanvault_types::{
    AccessReason, Content, CreatorId, EntitlementDecision, Subscription, UserId,
};

use crate::error::EvaluationError;

/// Decide access to `content` given the viewer's subscription to its creator.
///
/// `subscription` is `None` for anonymous viewers and for viewers with no
/// subscription row. Steps, first match wins:
///
/// 1. free content is granted
/// 2. no subscription, a subscription to another creator, or a non-Active
///    status is denied as `no-subscription`
/// 3. a tier that does not cover `content.required_tier` is denied as
///    `tier-insufficient`
/// 4. a period that ended at or before `now` is denied as `expired`, even
///    when the stored status still reads Active
/// 5. otherwise granted as `tier-sufficient`
pub fn decide(
    content: &Content,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> EntitlementDecision {
    if content.is_free {
        return EntitlementDecision::grant(AccessReason::Free);
    }

    let Some(subscription) = subscription else {
        return EntitlementDecision::deny(AccessReason::NoSubscription);
    };

    if subscription.creator_id != content.creator_id || !subscription.status.is_active() {
        return EntitlementDecision::deny(AccessReason::NoSubscription);
    }

    if !subscription.tier.grants(content.required_tier) {
        return EntitlementDecision::deny(AccessReason::TierInsufficient);
    }

    if !subscription.within_period(now) {
        return EntitlementDecision::deny(AccessReason::Expired);
    }

    EntitlementDecision::grant(AccessReason::TierSufficient)
}

/// Evaluates entitlements against the subscription record store
#[derive(Clone)]
pub struct EntitlementEvaluator {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl EntitlementEvaluator {
    /// Create a new evaluator
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Decide whether `user` may view `content` right now
    pub async fn can_access(
        &self,
        user: Option<UserId>,
        content: &Content,
    ) -> Result<EntitlementDecision, EvaluationError> {
        self.scope(user).evaluate(content).await
    }

    /// Start a request-scoped evaluation for `user`.
    ///
    /// The scope looks up each creator's subscription at most once and is
    /// meant to be dropped when the request completes.
    pub fn scope(&self, user: Option<UserId>) -> EvaluationScope<'_> {
        EvaluationScope {
            evaluator: self,
            user,
            now: Utc::now(),
            subscriptions: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for EntitlementEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementEvaluator").finish()
    }
}

/// Evaluation context for a single request
pub struct EvaluationScope<'a> {
    evaluator: &'a EntitlementEvaluator,
    user: Option<UserId>,
    now: DateTime<Utc>,
    subscriptions: HashMap<CreatorId, Option<Subscription>>,
}

impl EvaluationScope<'_> {
    /// Instant every decision in this scope is made against
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Decide access to one content item
    pub async fn evaluate(
        &mut self,
        content: &Content,
    ) -> Result<EntitlementDecision, EvaluationError> {
        let now = self.now;
        // Free content needs no lookup, even for signed-in viewers
        let decision = match self.user {
            Some(user) if !content.is_free => {
                let subscription = self.subscription_for(user, content.creator_id).await?;
                decide(content, subscription, now)
            }
            _ => decide(content, None, now),
        };

        metrics::counter!(
            "fanvault_entitlement_decisions_total",
            "reason" => decision.reason.as_str()
        )
        .increment(1);

        tracing::debug!(
            content_id = %content.id,
            user_id = ?self.user,
            granted = decision.granted,
            reason = %decision.reason,
            "Entitlement evaluated"
        );

        Ok(decision)
    }

    async fn subscription_for(
        &mut self,
        user: UserId,
        creator_id: CreatorId,
    ) -> Result<Option<&Subscription>, EvaluationError> {
        if !self.subscriptions.contains_key(&creator_id) {
            let found = self
                .evaluator
                .subscriptions
                .find_active(user, creator_id)
                .await?;
            self.subscriptions.insert(creator_id, found);
        }
        Ok(self.subscriptions.get(&creator_id).and_then(Option::as_ref))
    }
}
