//! Content item handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use fanvault_access_core::{ContentView, ViewOutcome};

use crate::error::ApiResult;
use crate::extractors::MaybeUser;
use crate::handlers::shared::parse_content_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub counted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<i64>,
}

impl From<ViewOutcome> for ViewResponse {
    fn from(outcome: ViewOutcome) -> Self {
        match outcome {
            ViewOutcome::Counted(total) => Self {
                counted: true,
                view_count: Some(total),
            },
            ViewOutcome::Suppressed => Self {
                counted: false,
                view_count: None,
            },
        }
    }
}

/// GET /api/v1/content/{id}
pub async fn get_content(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(content_id): Path<String>,
) -> ApiResult<Json<ContentView>> {
    let content_id = parse_content_id(&content_id)?;
    let view = state.access.get_feed_item(user, content_id).await?;
    Ok(Json(view))
}

/// POST /api/v1/content/{id}/view
pub async fn record_view(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(content_id): Path<String>,
) -> ApiResult<Json<ViewResponse>> {
    let content_id = parse_content_id(&content_id)?;
    let outcome = state.access.record_view(user, content_id).await?;
    Ok(Json(outcome.into()))
}
