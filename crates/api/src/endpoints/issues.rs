//! Issue submission and viewing endpoints.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    routing::get,
};
use civic_common::{AppError, AppResult};
use civic_core::{CreateIssueInput, IssueDetails, IssueWithOwner, PhotoUpload};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// The current user's issues, newest first.
async fn list_issues(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<IssueWithOwner>>> {
    let issues = state.issue_service.list_for(&user).await?;
    Ok(ApiResponse::ok(issues))
}

/// Submit an issue via multipart form.
///
/// Text fields `title`, `description`, `category`, `location`; any number
/// of files under `photos` or `photos[]`.
async fn create_issue(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<IssueDetails>> {
    let mut input = CreateIssueInput::default();
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "photos" | "photos[]" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                // Browsers send an empty part for an untouched file input
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                photos.push(PhotoUpload { filename, data });
            }
            "title" | "description" | "category" | "location" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let slot = match name.as_str() {
                    "title" => &mut input.title,
                    "description" => &mut input.description,
                    "category" => &mut input.category,
                    _ => &mut input.location,
                };
                *slot = text;
            }
            _ => {}
        }
    }

    let issue = state.issue_service.create(&user, input, photos).await?;
    Ok(ApiResponse::created(issue).with_message("Issue submitted!"))
}

/// A single issue; owners and admins only.
async fn show_issue(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<IssueDetails>> {
    let issue = state.issue_service.get_for(&user, &id).await?;
    Ok(ApiResponse::ok(issue))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_issues).post(create_issue))
        .route("/{id}", get(show_issue))
}
