//! Creator and tier offering types

use serde::{Deserialize, Serialize};

use crate::{CreatorId, Tier, TierId};

/// A creator who publishes content and sells tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Creator ID
    pub id: CreatorId,
    /// Display name
    pub display_name: String,
    /// Number of active subscriptions
    pub subscriber_count: i64,
}

/// A tier offering sold by one creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    /// Tier offering ID
    pub id: TierId,
    /// Owning creator
    pub creator_id: CreatorId,
    /// Level in the tier hierarchy
    pub tier: Tier,
    /// Monthly price in minor currency units
    pub price_cents: i64,
    /// Display-only feature list
    pub features: Vec<String>,
}
