//! Dashboard endpoint.

use axum::{Router, extract::State, routing::get};
use civic_common::AppResult;
use civic_core::Dashboard;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Role-dependent dashboard for the current user.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Dashboard>> {
    let dashboard = state.dashboard_service.for_viewer(&user).await?;
    Ok(ApiResponse::ok(dashboard))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(show))
}
