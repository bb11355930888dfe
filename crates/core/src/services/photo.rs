//! Photo attachment service.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use civic_common::{AppResult, FieldErrors, IdGenerator, StorageBackend, generate_storage_key};
use civic_db::{entities::issue_photo, repositories::IssuePhotoRepository};
use sea_orm::Set;

/// Shared storage backend.
pub type StorageService = Arc<dyn StorageBackend>;

/// Largest accepted photo, in bytes.
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

const PHOTO_NAMESPACE: &str = "issue-photos";

/// A photo received with an issue submission.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Client-supplied file name.
    pub filename: String,
    /// Raw file content.
    pub data: Bytes,
}

/// Accepted photo formats, detected from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    /// JPEG, stored as `.jpg`.
    Jpeg,
    /// PNG.
    Png,
}

impl PhotoFormat {
    /// Get file extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Sniff the format from magic bytes.
    ///
    /// Returns `Ok(None)` for images of another format and `Err(())` when the
    /// data is not a recognizable image at all.
    #[allow(clippy::result_unit_err)]
    pub fn detect(data: &[u8]) -> Result<Option<Self>, ()> {
        match image::guess_format(data) {
            Ok(image::ImageFormat::Jpeg) => Ok(Some(Self::Jpeg)),
            Ok(image::ImageFormat::Png) => Ok(Some(Self::Png)),
            Ok(_) => Ok(None),
            Err(_) => Err(()),
        }
    }
}

/// Check every upload, keying failures as `photos.<index>`.
///
/// Returns the detected format of each photo when all of them pass.
pub fn validate_photos(photos: &[PhotoUpload]) -> Result<Vec<PhotoFormat>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut formats = Vec::with_capacity(photos.len());

    for (index, photo) in photos.iter().enumerate() {
        let field = format!("photos.{index}");

        match PhotoFormat::detect(&photo.data) {
            Ok(Some(format)) => formats.push(format),
            Ok(None) => {
                errors.add(&field, format!("The {field} field must be a file of type: jpeg, png, jpg."));
            }
            Err(()) => {
                errors.add(&field, format!("The {field} field must be an image."));
                errors.add(&field, format!("The {field} field must be a file of type: jpeg, png, jpg."));
            }
        }

        if photo.data.len() > MAX_PHOTO_SIZE {
            errors.add(
                &field,
                format!(
                    "The {field} field must not be greater than {} kilobytes.",
                    MAX_PHOTO_SIZE / 1024
                ),
            );
        }

        if errors.contains(&field) {
            tracing::warn!(
                field = %field,
                filename = %photo.filename,
                size = photo.data.len(),
                "Rejected photo upload"
            );
        }
    }

    if errors.is_empty() {
        Ok(formats)
    } else {
        Err(errors)
    }
}

/// Writes photo bytes to storage and records their metadata.
#[derive(Clone)]
pub struct PhotoService {
    photo_repo: IssuePhotoRepository,
    storage: StorageService,
    id_gen: IdGenerator,
}

impl PhotoService {
    /// Create a new photo service.
    #[must_use]
    pub fn new(photo_repo: IssuePhotoRepository, storage: StorageService) -> Self {
        Self {
            photo_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store one validated photo under the issue's namespace.
    ///
    /// The bytes are written before the metadata row is inserted.
    pub async fn store(
        &self,
        issue_id: &str,
        photo: &PhotoUpload,
        format: PhotoFormat,
    ) -> AppResult<issue_photo::Model> {
        let key = generate_storage_key(PHOTO_NAMESPACE, issue_id, format.extension());
        let uploaded = self.storage.upload(&key, &photo.data).await?;

        let now = Utc::now();
        let model = issue_photo::ActiveModel {
            id: Set(self.id_gen.generate()),
            issue_id: Set(issue_id.to_string()),
            filename: Set(photo.filename.clone()),
            path: Set(uploaded.key),
            size: Set(Some(uploaded.size as i64)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let stored = self.photo_repo.create(model).await?;
        tracing::debug!(issue_id = %issue_id, photo_id = %stored.id, path = %stored.path, "Stored photo");
        Ok(stored)
    }
}
