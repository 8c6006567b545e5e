//! Shared handler utilities
//!
//! Query and path parsing used across handlers.

use serde::Deserialize;

use fanvault_types::{ContentId, CreatorId};

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Pagination
// ============================================================================

/// `?page=&page_size=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// Clamp to the service's page bounds
    pub fn resolve(&self, state: &AppState) -> fanvault_access_core::Page {
        state.access.page(self.page, self.page_size)
    }
}

// ============================================================================
// Path Parameters
// ============================================================================

/// Parse a creator id path segment
pub fn parse_creator_id(raw: &str) -> Result<CreatorId, ApiError> {
    CreatorId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid creator id".into()))
}

/// Parse a content id path segment.
///
/// A reference that can never name an item is reported as not found.
pub fn parse_content_id(raw: &str) -> Result<ContentId, ApiError> {
    ContentId::parse(raw).map_err(|_| fanvault_access_core::AccessError::ContentNotFound.into())
}

// ============================================================================
// Tests
// ============================================================================
