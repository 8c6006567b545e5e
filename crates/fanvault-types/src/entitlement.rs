//! Entitlement decision types

use serde::{Deserialize, Serialize};

/// Why access was granted or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessReason {
    /// Content is free
    Free,
    /// Subscriber's tier covers the content
    TierSufficient,
    /// Subscriber's tier is below the content's tier
    TierInsufficient,
    /// No usable subscription (anonymous, never subscribed, past due, canceled)
    NoSubscription,
    /// Subscription period has ended
    Expired,
}

impl AccessReason {
    /// Label used in logs and metrics
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::TierSufficient => "tier-sufficient",
            Self::TierInsufficient => "tier-insufficient",
            Self::NoSubscription => "no-subscription",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for AccessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one (user, content) pair.
///
/// Derived fresh per request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    /// Whether access is allowed
    pub granted: bool,
    /// Reason for the outcome
    pub reason: AccessReason,
}

impl EntitlementDecision {
    /// Grant with the given reason
    pub const fn grant(reason: AccessReason) -> Self {
        Self {
            granted: true,
            reason,
        }
    }

    /// Deny with the given reason
    pub const fn deny(reason: AccessReason) -> Self {
        Self {
            granted: false,
            reason,
        }
    }
}
