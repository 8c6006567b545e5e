//! Feed handlers

use axum::extract::{Path, Query, State};
use axum::Json;

use fanvault_access_core::ContentView;

use crate::error::ApiResult;
use crate::extractors::MaybeUser;
use crate::handlers::shared::{parse_creator_id, PageQuery};
use crate::state::AppState;

/// GET /api/v1/feed
pub async fn list_feed(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<ContentView>>> {
    let page = query.resolve(&state);
    let views = state.access.list_feed(user, page).await?;
    Ok(Json(views))
}

/// GET /api/v1/creators/{id}/feed
pub async fn list_creator_feed(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(creator_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<ContentView>>> {
    let creator_id = parse_creator_id(&creator_id)?;
    let page = query.resolve(&state);
    let views = state
        .access
        .list_creator_feed(user, creator_id, page)
        .await?;
    Ok(Json(views))
}
