//! API endpoints.

#![allow(missing_docs)]

mod admin;
mod community;
mod dashboard;
mod issues;

use axum::{Router, http::Uri};
use civic_common::AppError;

use crate::middleware::AppState;

/// Create the API router.
///
/// Authentication is applied by the caller with
/// [`crate::middleware::auth_middleware`]; request body limits likewise.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(community::router())
        .nest("/dashboard", dashboard::router())
        .nest("/issues", issues::router())
        .nest("/admin", admin::router())
        .fallback(route_not_found)
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {}", uri.path()))
}
