//! Subscription tier types and the tier hierarchy

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Subscription tier levels offered by a creator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Entry tier
    Basic,
    /// Mid tier, includes everything in Basic
    Premium,
    /// Top tier, includes everything in Premium
    Vip,
}

/// The tier hierarchy, lowest first.
///
/// Every ordering decision in the workspace goes through this table.
pub const TIER_ORDER: [Tier; 3] = [Tier::Basic, Tier::Premium, Tier::Vip];

impl Tier {
    /// The lowest tier in the hierarchy
    pub const fn lowest() -> Self {
        TIER_ORDER[0]
    }

    /// The highest tier in the hierarchy
    pub const fn highest() -> Self {
        TIER_ORDER[TIER_ORDER.len() - 1]
    }

    /// Position of this tier in [`TIER_ORDER`]
    pub fn level(self) -> usize {
        TIER_ORDER
            .iter()
            .position(|t| *t == self)
            .unwrap_or_default()
    }

    /// Tiers a holder of `self` is entitled to view, lowest first.
    ///
    /// The hierarchy is cumulative: owning a tier grants every tier at or
    /// below it.
    pub fn accessible_tiers(self) -> &'static [Tier] {
        &TIER_ORDER[..=self.level()]
    }

    /// Whether owning `self` grants content that requires `required`
    pub fn grants(self, required: Tier) -> bool {
        self.accessible_tiers().contains(&required)
    }

    /// Wire/storage name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Vip => "vip",
        }
    }

    /// Resolve the tier a subscriber owns from a stored value.
    ///
    /// Missing or unrecognized values resolve to the lowest tier.
    pub fn owned_or_lowest(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Self::lowest())
    }

    /// Resolve the tier a content item requires from a stored value.
    ///
    /// Missing or unrecognized values resolve to the highest tier so that a
    /// bad value never widens access.
    pub fn required_or_highest(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Self::highest())
    }
}

/// Tiers visible to the holder of `owned`; absent ownership resolves to the
/// lowest tier.
pub fn accessible_tiers(owned: Option<Tier>) -> &'static [Tier] {
    owned.unwrap_or(Tier::lowest()).accessible_tiers()
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "vip" => Ok(Self::Vip),
            _ => Err(ParseError::InvalidTier(s.to_string())),
        }
    }
}

impl PartialOrd for Tier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level().cmp(&other.level())
    }
}
