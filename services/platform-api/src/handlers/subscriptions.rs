//! Subscription handlers

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use fanvault_types::{CreatorId, Subscription, SubscriptionId, SubscriptionStatus, Tier, TierId};

use crate::error::ApiResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

/// Subscription as shown to its owner; the billing reference stays internal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: SubscriptionId,
    pub creator_id: CreatorId,
    pub tier_id: TierId,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            creator_id: sub.creator_id,
            tier_id: sub.tier_id,
            tier: sub.tier,
            status: sub.status,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
        }
    }
}

/// GET /api/v1/me/subscriptions
pub async fn list_my_subscriptions(
    State(state): State<AppState>,
    user: MaybeUser,
) -> ApiResult<Json<Vec<SubscriptionResponse>>> {
    let user_id = user.require()?;
    let subs = state.access.list_subscriptions(user_id).await?;
    Ok(Json(subs.into_iter().map(Into::into).collect()))
}
