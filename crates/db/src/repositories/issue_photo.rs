//! Issue photo repository.

use std::sync::Arc;

use crate::entities::{IssuePhoto, issue_photo};
use civic_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Issue photo repository for database operations.
#[derive(Clone)]
pub struct IssuePhotoRepository {
    db: Arc<DatabaseConnection>,
}

impl IssuePhotoRepository {
    /// Create a new issue photo repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a stored photo.
    pub async fn create(&self, model: issue_photo::ActiveModel) -> AppResult<issue_photo::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Photos attached to one issue, in upload order.
    pub async fn find_by_issue(&self, issue_id: &str) -> AppResult<Vec<issue_photo::Model>> {
        IssuePhoto::find()
            .filter(issue_photo::Column::IssueId.eq(issue_id))
            .order_by_asc(issue_photo::Column::CreatedAt)
            .order_by_asc(issue_photo::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Photos attached to any of the given issues.
    pub async fn find_by_issue_ids(
        &self,
        issue_ids: &[String],
    ) -> AppResult<Vec<issue_photo::Model>> {
        if issue_ids.is_empty() {
            return Ok(vec![]);
        }

        IssuePhoto::find()
            .filter(issue_photo::Column::IssueId.is_in(issue_ids.to_vec()))
            .order_by_asc(issue_photo::Column::CreatedAt)
            .order_by_asc(issue_photo::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
