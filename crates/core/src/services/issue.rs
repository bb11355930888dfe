//! Issue service.

use chrono::Utc;
use civic_common::{AppError, AppResult, FieldErrors, IdGenerator};
use civic_db::{
    entities::{issue, issue::IssueStatus, user},
    repositories::{IssueRepository, IssueScope},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::services::{
    hydrate::{IssueDetails, IssueHydrator, IssueWithOwner, OwnerSummary},
    photo::{PhotoService, PhotoUpload, validate_photos},
};

/// Input for submitting a new issue.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateIssueInput {
    /// Short summary.
    #[validate(
        custom(function = "required", message = "The title field is required."),
        length(max = 255, message = "The title field must not be greater than 255 characters.")
    )]
    #[serde(default)]
    pub title: String,

    /// Full description.
    #[validate(custom(function = "required", message = "The description field is required."))]
    #[serde(default)]
    pub description: String,

    /// Free-form category.
    #[validate(custom(function = "required", message = "The category field is required."))]
    #[serde(default)]
    pub category: String,

    /// Where the problem is.
    #[validate(
        custom(function = "required", message = "The location field is required."),
        length(max = 255, message = "The location field must not be greater than 255 characters.")
    )]
    #[serde(default)]
    pub location: String,
}

impl CreateIssueInput {
    /// Trim surrounding whitespace from every field.
    #[must_use]
    pub fn trimmed(self) -> Self {
        let trim = |s: String| s.trim().to_string();
        Self {
            title: trim(self.title),
            description: trim(self.description),
            category: trim(self.category),
            location: trim(self.location),
        }
    }
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Issue service for submission and retrieval.
#[derive(Clone)]
pub struct IssueService {
    issue_repo: IssueRepository,
    photos: PhotoService,
    hydrator: IssueHydrator,
    id_gen: IdGenerator,
}

impl IssueService {
    /// Create a new issue service.
    #[must_use]
    pub fn new(issue_repo: IssueRepository, photos: PhotoService, hydrator: IssueHydrator) -> Self {
        Self {
            issue_repo,
            photos,
            hydrator,
            id_gen: IdGenerator::new(),
        }
    }

    /// The viewer's own issues, newest first.
    pub async fn list_for(&self, viewer: &user::Model) -> AppResult<Vec<IssueWithOwner>> {
        let issues = self
            .issue_repo
            .find_latest(IssueScope::Owner(&viewer.id), None)
            .await?;
        self.hydrator.with_owners(issues).await
    }

    /// A single issue, visible to its owner and to admins.
    pub async fn get_for(&self, viewer: &user::Model, id: &str) -> AppResult<IssueDetails> {
        let issue = self.issue_repo.get_by_id(id).await?;

        if issue.user_id != viewer.id && !viewer.is_admin {
            tracing::warn!(issue_id = %id, user_id = %viewer.id, "Denied access to issue");
            return Err(AppError::Forbidden(
                "You may only view your own issues".to_string(),
            ));
        }

        self.hydrator.details(issue).await
    }

    /// Submit a new issue with optional photos.
    ///
    /// Field and photo problems are reported together and nothing is written
    /// unless everything passes. A storage failure after the issue row exists
    /// leaves the issue and any photos stored before it in place.
    pub async fn create(
        &self,
        owner: &user::Model,
        input: CreateIssueInput,
        photos: Vec<PhotoUpload>,
    ) -> AppResult<IssueDetails> {
        let input = input.trimmed();

        let mut errors = match input.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };
        let formats = match validate_photos(&photos) {
            Ok(formats) => formats,
            Err(photo_errors) => {
                errors.merge(photo_errors);
                Vec::new()
            }
        };
        errors.into_result()?;

        let now = Utc::now();
        let model = issue::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(owner.id.clone()),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            location: Set(input.location),
            status: Set(IssueStatus::Pending),
            admin_notes: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let issue = self.issue_repo.create(model).await?;

        let mut stored = Vec::with_capacity(photos.len());
        for (photo, format) in photos.iter().zip(formats) {
            let row = self.photos.store(&issue.id, photo, format).await?;
            stored.push(self.hydrator.photo_view(row));
        }

        tracing::info!(
            issue_id = %issue.id,
            user_id = %owner.id,
            photos = stored.len(),
            "Issue submitted"
        );

        Ok(IssueDetails {
            owner: Some(OwnerSummary::from(owner)),
            photos: stored,
            issue,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::hydrate::tests::{
        empty_db, test_issue, test_photo, test_storage, test_user,
    };
    use crate::services::photo::StorageService;
    use bytes::Bytes;
    use civic_common::LocalStorage;
    use civic_db::repositories::{IssuePhotoRepository, UserRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn create_test_service(
        issue_db: Arc<DatabaseConnection>,
        user_db: Arc<DatabaseConnection>,
        photo_db: Arc<DatabaseConnection>,
        storage: StorageService,
    ) -> IssueService {
        let photo_repo = IssuePhotoRepository::new(photo_db);
        IssueService::new(
            IssueRepository::new(issue_db),
            PhotoService::new(photo_repo.clone(), storage.clone()),
            IssueHydrator::new(UserRepository::new(user_db), photo_repo, storage),
        )
    }

    fn valid_input() -> CreateIssueInput {
        CreateIssueInput {
            title: "  Broken streetlight ".to_string(),
            description: "The light on the corner has been out for a week".to_string(),
            category: "lighting".to_string(),
            location: "Elm St".to_string(),
        }
    }

    #[test]
    fn test_validation_requires_trimmed_fields() {
        let input = CreateIssueInput {
            title: "   ".to_string(),
            ..valid_input()
        }
        .trimmed();

        let errors = FieldErrors::from(input.validate().unwrap_err());
        assert_eq!(
            errors.get("title").unwrap(),
            ["The title field is required.".to_string()]
        );
    }

    #[test]
    fn test_validation_title_length_boundary() {
        let ok = CreateIssueInput {
            title: "a".repeat(255),
            ..valid_input()
        };
        assert!(ok.validate().is_ok());

        let too_long = CreateIssueInput {
            title: "a".repeat(256),
            ..valid_input()
        };
        let errors = FieldErrors::from(too_long.validate().unwrap_err());
        assert_eq!(
            errors.get("title").unwrap(),
            ["The title field must not be greater than 255 characters.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_sets_pending_and_owner() {
        let owner = test_user("u1", false);
        let created = test_issue("i1", "u1", IssueStatus::Pending);

        let issue_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created]])
                .into_connection(),
        );

        let service = create_test_service(issue_db.clone(), empty_db(), empty_db(), test_storage());
        let details = service.create(&owner, valid_input(), vec![]).await.unwrap();

        assert_eq!(details.issue.status, IssueStatus::Pending);
        assert_eq!(details.issue.user_id, "u1");
        assert_eq!(details.owner.unwrap().id, "u1");
        assert!(details.photos.is_empty());

        drop(service);
        let log = Arc::try_unwrap(issue_db).unwrap().into_transaction_log();
        let sql = format!("{log:?}");
        assert!(sql.contains("Broken streetlight"));
        assert!(!sql.contains("  Broken streetlight "));
        assert!(sql.contains("pending"));
    }

    #[tokio::test]
    async fn test_create_stores_photos() {
        let dir = tempfile::tempdir().unwrap();
        let storage: StorageService = Arc::new(LocalStorage::new(
            dir.path().to_path_buf(),
            "/storage".to_string(),
        ));
        let owner = test_user("u1", false);

        let issue_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_issue("i1", "u1", IssueStatus::Pending)]])
                .into_connection(),
        );
        let photo_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_photo("p1", "i1")]])
                .into_connection(),
        );

        let service = create_test_service(issue_db, empty_db(), photo_db, storage);
        let photo = PhotoUpload {
            filename: "corner.png".to_string(),
            data: Bytes::from_static(PNG_HEADER),
        };
        let details = service.create(&owner, valid_input(), vec![photo]).await.unwrap();

        assert_eq!(details.photos.len(), 1);
        assert!(dir.path().join("issue-photos/i1").is_dir());
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_photo_without_writing() {
        let owner = test_user("u1", false);
        let mut data = PNG_HEADER.to_vec();
        data.resize(6 * 1024 * 1024, 0);

        let service = create_test_service(empty_db(), empty_db(), empty_db(), test_storage());
        let photo = PhotoUpload {
            filename: "huge.png".to_string(),
            data: Bytes::from(data),
        };
        let result = service.create(&owner, valid_input(), vec![photo]).await;

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.contains("photos.0"));
                assert!(!errors.contains("title"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_reports_field_and_photo_errors_together() {
        let owner = test_user("u1", false);
        let input = CreateIssueInput {
            location: String::new(),
            ..valid_input()
        };
        let photo = PhotoUpload {
            filename: "notes.txt".to_string(),
            data: Bytes::from_static(b"plain text"),
        };

        let service = create_test_service(empty_db(), empty_db(), empty_db(), test_storage());
        let result = service.create(&owner, input, vec![photo]).await;

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.contains("location"));
                assert!(errors.contains("photos.0"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_for_forbids_other_users() {
        let viewer = test_user("u1", false);

        let issue_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_issue("i1", "u2", IssueStatus::Pending)]])
                .into_connection(),
        );

        let service = create_test_service(issue_db, empty_db(), empty_db(), test_storage());
        let result = service.get_for(&viewer, "i1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_get_for_allows_admin() {
        let admin = test_user("admin", true);

        let issue_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_issue("i1", "u2", IssueStatus::Pending)]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("u2", false)]])
                .into_connection(),
        );
        let photo_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_photo("p1", "i1")]])
                .into_connection(),
        );

        let service = create_test_service(issue_db, user_db, photo_db, test_storage());
        let details = service.get_for(&admin, "i1").await.unwrap();

        assert_eq!(details.owner.unwrap().id, "u2");
        assert_eq!(details.photos.len(), 1);
    }

    #[tokio::test]
    async fn test_get_for_unknown_issue() {
        let viewer = test_user("u1", false);

        let issue_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<issue::Model>::new()])
                .into_connection(),
        );

        let service = create_test_service(issue_db, empty_db(), empty_db(), test_storage());
        let result = service.get_for(&viewer, "missing").await;

        assert!(matches!(result, Err(AppError::IssueNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_for_returns_own_issues_with_owner() {
        let viewer = test_user("u1", false);

        let issue_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_issue("i2", "u1", IssueStatus::Pending),
                    test_issue("i1", "u1", IssueStatus::Resolved),
                ]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[viewer.clone()]])
                .into_connection(),
        );

        let service = create_test_service(issue_db, user_db, empty_db(), test_storage());
        let issues = service.list_for(&viewer).await.unwrap();

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.owner.as_ref().unwrap().id == "u1"));
    }
}
