//! Axum extractors for caller identity
//!
//! The upstream auth gateway resolves sessions and forwards the caller's
//! user id in `x-user-id`. No header means an anonymous viewer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use fanvault_types::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity, `None` for anonymous requests
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

impl MaybeUser {
    /// The user id, or 401 for anonymous callers
    pub fn require(self) -> Result<UserId, ApiError> {
        self.0.ok_or(ApiError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Self(None));
        };

        let raw = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid x-user-id header encoding".into()))?;

        let user_id = UserId::parse(raw.trim()).map_err(|_| {
            tracing::debug!(header = raw, "Unparseable user id");
            ApiError::BadRequest("Invalid x-user-id header".into())
        })?;

        Ok(Self(Some(user_id)))
    }
}
