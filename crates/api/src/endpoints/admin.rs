//! Admin triage endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use civic_common::AppResult;
use civic_core::{IssueDetails, UpdateIssueInput};

use crate::{
    extractors::{AdminUser, JsonBody},
    middleware::AppState,
    response::ApiResponse,
};

/// All issues with owners and photos.
async fn list_issues(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<IssueDetails>>> {
    let issues = state.triage_service.list().await?;
    Ok(ApiResponse::ok(issues))
}

async fn show_issue(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<IssueDetails>> {
    let issue = state.triage_service.show(&id).await?;
    Ok(ApiResponse::ok(issue))
}

/// Set status and notes.
async fn update_issue(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<UpdateIssueInput>,
) -> AppResult<ApiResponse<IssueDetails>> {
    let issue = state.triage_service.update(&id, &input).await?;
    tracing::debug!(issue_id = %id, admin_id = %admin.id, "Admin updated issue");
    Ok(ApiResponse::ok(issue).with_message("Issue updated successfully!"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/issues", get(list_issues))
        .route("/issues/{id}", get(show_issue).patch(update_issue))
}
