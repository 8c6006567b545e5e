//! Content types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContentId, CreatorId, Tier};

/// A creator-owned media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Content ID
    pub id: ContentId,
    /// Owning creator
    pub creator_id: CreatorId,
    /// Title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Object-storage key of the underlying media; never sent to clients
    pub media_key: String,
    /// Minimum tier needed to view; ignored when `is_free`
    pub required_tier: Tier,
    /// Free content bypasses all tier checks
    pub is_free: bool,
    /// Number of counted views
    pub view_count: i64,
    /// When the content was published
    pub created_at: DateTime<Utc>,
}
