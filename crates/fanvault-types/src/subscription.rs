//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CreatorId, ParseError, SubscriptionId, Tier, TierId, UserId};

/// Subscription status
///
/// "Never subscribed" is modeled as the absence of a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active
    Active,
    /// Payment is past due
    PastDue,
    /// Subscription was canceled; the row is kept for reporting
    #[serde(rename = "canceled")]
    Cancelled,
}

impl SubscriptionStatus {
    /// Storage name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "canceled",
        }
    }

    /// Whether this status counts toward a creator's subscriber total
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" | "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// A subscriber's binding to one creator at one tier
///
/// At most one exists per (subscriber, creator) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// Subscriber
    pub subscriber_id: UserId,
    /// Creator being subscribed to
    pub creator_id: CreatorId,
    /// The creator's tier offering
    pub tier_id: TierId,
    /// Tier level of `tier_id`
    pub tier: Tier,
    /// Subscription status
    pub status: SubscriptionStatus,
    /// Current billing period start
    pub current_period_start: DateTime<Utc>,
    /// Current billing period end (exclusive)
    pub current_period_end: DateTime<Utc>,
    /// Upstream billing subscription reference
    pub external_billing_id: String,
    /// When the subscription was created
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether `now` falls before the end of the current period
    pub fn within_period(&self, now: DateTime<Utc>) -> bool {
        self.current_period_end > now
    }
}

/// Result of a store mutation that may change a subscription's status
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    /// Status before the write; `None` when the row was created by it
    pub previous: Option<SubscriptionStatus>,
    /// The subscription as written
    pub subscription: Subscription,
}

impl StatusChange {
    /// Change in the creator's active-subscriber count implied by this write
    pub fn active_delta(&self) -> i64 {
        let was = self.previous.is_some_and(|s| s.is_active());
        let is = self.subscription.status.is_active();
        match (was, is) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        }
    }
}
