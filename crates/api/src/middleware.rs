//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use civic_core::{
    CommunityService, DashboardService, IssueHydrator, IssueService, PhotoService, StorageService,
    TriageService, UserService,
};
use civic_db::repositories::{IssuePhotoRepository, IssueRepository, UserRepository};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub issue_service: IssueService,
    pub dashboard_service: DashboardService,
    pub community_service: CommunityService,
    pub triage_service: TriageService,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, storage: StorageService) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let issue_repo = IssueRepository::new(Arc::clone(&db));
        let photo_repo = IssuePhotoRepository::new(db);

        let hydrator = IssueHydrator::new(user_repo.clone(), photo_repo.clone(), storage.clone());
        let photo_service = PhotoService::new(photo_repo, storage);

        Self {
            user_service: UserService::new(user_repo),
            issue_service: IssueService::new(issue_repo.clone(), photo_service, hydrator.clone()),
            dashboard_service: DashboardService::new(issue_repo.clone(), hydrator.clone()),
            community_service: CommunityService::new(issue_repo.clone(), hydrator.clone()),
            triage_service: TriageService::new(issue_repo, hydrator),
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. Requests without a valid token pass through
/// anonymously; the extractors decide whether that is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
            }
        }
    }

    next.run(req).await
}
