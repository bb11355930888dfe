//! Admin triage of issues.

use chrono::Utc;
use civic_common::{AppError, AppResult, FieldErrors};
use civic_db::{
    entities::issue::{self, IssueStatus},
    repositories::{IssueRepository, IssueScope},
};
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::services::hydrate::{IssueDetails, IssueHydrator};

/// Input for an admin update.
///
/// Fields stay untyped JSON so a wrongly typed value is reported against
/// its field instead of failing the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIssueInput {
    /// Required; one of `pending`, `in_progress`, `resolved`.
    #[serde(default)]
    pub status: Option<Value>,

    /// Absent leaves the notes alone, `null` or blank clears them.
    #[serde(default, deserialize_with = "present")]
    pub admin_notes: Option<Value>,
}

/// Keep an explicit `null` as `Some(Value::Null)`; only absence is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A validated admin update.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Triage {
    status: IssueStatus,
    /// `None` leaves the notes alone, `Some(None)` clears them.
    notes: Option<Option<String>>,
}

impl UpdateIssueInput {
    fn validate(&self) -> AppResult<Triage> {
        let mut errors = FieldErrors::new();

        let status = match &self.status {
            None | Some(Value::Null) => {
                errors.add("status", "The status field is required.");
                None
            }
            Some(Value::String(raw)) if raw.trim().is_empty() => {
                errors.add("status", "The status field is required.");
                None
            }
            Some(Value::String(raw)) => raw.trim().parse::<IssueStatus>().map_or_else(
                |_| {
                    errors.add("status", "The selected status is invalid.");
                    None
                },
                Some,
            ),
            Some(_) => {
                errors.add("status", "The selected status is invalid.");
                None
            }
        };

        let notes = match &self.admin_notes {
            None => None,
            Some(Value::Null) => Some(None),
            Some(Value::String(raw)) => {
                let trimmed = raw.trim();
                Some((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(_) => {
                errors.add("admin_notes", "The admin notes field must be a string.");
                None
            }
        };

        match status {
            Some(status) if errors.is_empty() => Ok(Triage { status, notes }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Admin listing and status/notes updates.
#[derive(Clone)]
pub struct TriageService {
    issue_repo: IssueRepository,
    hydrator: IssueHydrator,
}

impl TriageService {
    /// Create a new triage service.
    #[must_use]
    pub const fn new(issue_repo: IssueRepository, hydrator: IssueHydrator) -> Self {
        Self {
            issue_repo,
            hydrator,
        }
    }

    /// Every issue, newest first, with owner and photos.
    pub async fn list(&self) -> AppResult<Vec<IssueDetails>> {
        let issues = self.issue_repo.find_latest(IssueScope::All, None).await?;
        self.hydrator.with_details(issues).await
    }

    /// One issue with owner and photos.
    pub async fn show(&self, id: &str) -> AppResult<IssueDetails> {
        let issue = self.issue_repo.get_by_id(id).await?;
        self.hydrator.details(issue).await
    }

    /// Set status and optionally notes in one row update.
    ///
    /// Any status may follow any other.
    pub async fn update(&self, id: &str, input: &UpdateIssueInput) -> AppResult<IssueDetails> {
        let issue = self.issue_repo.get_by_id(id).await?;
        let Triage { status, notes } = input.validate()?;
        let previous = issue.status;

        let mut model: issue::ActiveModel = issue.into_active_model();
        model.status = Set(status);
        if let Some(notes) = notes {
            model.admin_notes = Set(notes);
        }
        model.updated_at = Set(Utc::now().into());

        let updated = self.issue_repo.update(model).await?;
        tracing::info!(
            issue_id = %updated.id,
            from = %previous,
            to = %updated.status,
            "Issue triaged"
        );

        self.hydrator.details(updated).await
    }
}
