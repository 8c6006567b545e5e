//! Response shaping for content items

use chrono::{DateTime, Utc};
use serde::Serialize;

use fanvault_types::{AccessReason, Content, ContentId, CreatorId, EntitlementDecision, Tier};

/// A content item as returned to a viewer.
///
/// Denied views carry no media reference at all; `access_required` names
/// the tier to upsell instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentView {
    pub id: ContentId,
    pub creator_id: CreatorId,
    pub title: String,
    pub description: Option<String>,
    /// Time-limited signed reference, `None` when access is denied
    pub media_url: Option<String>,
    pub required_tier: Tier,
    pub is_free: bool,
    pub has_access: bool,
    pub reason: AccessReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_required: Option<Tier>,
    pub created_at: DateTime<Utc>,
}

impl ContentView {
    /// Shape a view. `signed_url` is only read when the decision grants.
    pub fn new(
        content: Content,
        decision: EntitlementDecision,
        signed_url: impl FnOnce(&str) -> String,
    ) -> Self {
        let (media_url, access_required) = if decision.granted {
            (Some(signed_url(&content.media_key)), None)
        } else {
            (None, Some(content.required_tier))
        };

        Self {
            id: content.id,
            creator_id: content.creator_id,
            title: content.title,
            description: content.description,
            media_url,
            required_tier: content.required_tier,
            is_free: content.is_free,
            has_access: decision.granted,
            reason: decision.reason,
            access_required,
            created_at: content.created_at,
        }
    }
}
