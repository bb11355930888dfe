//! Public community progress page.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use civic_common::AppResult;
use civic_core::{BrowseQuery, CommunityPage};

use crate::{middleware::AppState, response::ApiResponse};

/// Browse resolved issues. No authentication required.
async fn browse(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> AppResult<ApiResponse<CommunityPage>> {
    let page = state.community_service.browse(&query).await?;
    Ok(ApiResponse::ok(page))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/community-progress", get(browse))
}
