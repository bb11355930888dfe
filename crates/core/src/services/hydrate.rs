//! Attaching owners and photos to issue rows.
//!
//! Related rows are loaded with one foreign-key query per relation and joined
//! in memory.

use std::collections::HashMap;

use civic_common::AppResult;
use civic_db::{
    entities::{issue, issue_photo, user},
    repositories::{IssuePhotoRepository, UserRepository},
};
use serde::Serialize;

use crate::services::photo::StorageService;

/// Public view of an issue's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerSummary {
    /// User ID.
    pub id: String,
    /// Display handle.
    pub username: String,
}

impl From<&user::Model> for OwnerSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

/// Photo metadata plus its public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoView {
    /// Photo ID.
    pub id: String,
    /// Original file name.
    pub filename: String,
    /// Storage key.
    pub path: String,
    /// Public URL of the stored file.
    pub url: String,
    /// Size in bytes.
    pub size: Option<i64>,
}

/// Issue with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueWithOwner {
    /// The issue row.
    #[serde(flatten)]
    pub issue: issue::Model,
    /// `None` if the owner row is gone.
    pub owner: Option<OwnerSummary>,
}

/// Issue with its owner and photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDetails {
    /// The issue row.
    #[serde(flatten)]
    pub issue: issue::Model,
    /// `None` if the owner row is gone.
    pub owner: Option<OwnerSummary>,
    /// Photos in upload order.
    pub photos: Vec<PhotoView>,
}

/// Loads the rows related to issues.
#[derive(Clone)]
pub struct IssueHydrator {
    user_repo: UserRepository,
    photo_repo: IssuePhotoRepository,
    storage: StorageService,
}

impl IssueHydrator {
    /// Create a new hydrator.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        photo_repo: IssuePhotoRepository,
        storage: StorageService,
    ) -> Self {
        Self {
            user_repo,
            photo_repo,
            storage,
        }
    }

    /// Public view of a stored photo.
    #[must_use]
    pub fn photo_view(&self, photo: issue_photo::Model) -> PhotoView {
        PhotoView {
            url: self.storage.public_url(&photo.path),
            id: photo.id,
            filename: photo.filename,
            path: photo.path,
            size: photo.size,
        }
    }

    /// Attach owners, preserving the input order.
    pub async fn with_owners(&self, issues: Vec<issue::Model>) -> AppResult<Vec<IssueWithOwner>> {
        let owners = self.owners_of(&issues).await?;

        Ok(issues
            .into_iter()
            .map(|issue| IssueWithOwner {
                owner: owners.get(&issue.user_id).cloned(),
                issue,
            })
            .collect())
    }

    /// Attach owners and photos, preserving the input order.
    pub async fn with_details(&self, issues: Vec<issue::Model>) -> AppResult<Vec<IssueDetails>> {
        let owners = self.owners_of(&issues).await?;

        let issue_ids: Vec<String> = issues.iter().map(|i| i.id.clone()).collect();
        let mut photos: HashMap<String, Vec<PhotoView>> = HashMap::new();
        for photo in self.photo_repo.find_by_issue_ids(&issue_ids).await? {
            photos
                .entry(photo.issue_id.clone())
                .or_default()
                .push(self.photo_view(photo));
        }

        Ok(issues
            .into_iter()
            .map(|issue| IssueDetails {
                owner: owners.get(&issue.user_id).cloned(),
                photos: photos.remove(&issue.id).unwrap_or_default(),
                issue,
            })
            .collect())
    }

    /// Attach owner and photos to a single issue.
    pub async fn details(&self, issue: issue::Model) -> AppResult<IssueDetails> {
        let owner = self.user_repo.find_by_id(&issue.user_id).await?;
        let photos = self
            .photo_repo
            .find_by_issue(&issue.id)
            .await?
            .into_iter()
            .map(|photo| self.photo_view(photo))
            .collect();

        Ok(IssueDetails {
            owner: owner.as_ref().map(OwnerSummary::from),
            photos,
            issue,
        })
    }

    async fn owners_of(&self, issues: &[issue::Model]) -> AppResult<HashMap<String, OwnerSummary>> {
        let mut user_ids: Vec<String> = issues.iter().map(|i| i.user_id.clone()).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        Ok(self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .iter()
            .map(|user| (user.id.clone(), OwnerSummary::from(user)))
            .collect())
    }
}
