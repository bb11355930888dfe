//! Issue repository.
//!
//! Every listing or aggregate takes an explicit [`IssueScope`]; related rows
//! (owners, photos) are loaded through their own repositories by foreign key.

use std::sync::Arc;

use crate::entities::{Issue, issue, issue::IssueStatus};
use chrono::{DateTime, NaiveDate, Utc};
use civic_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Func, LikeExpr},
};
use serde::Serialize;

/// Which issues a query may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueScope<'a> {
    /// Every issue (admin and public views).
    All,
    /// Only issues owned by the given user.
    Owner(&'a str),
}

impl IssueScope<'_> {
    fn apply<Q: QueryFilter>(self, query: Q) -> Q {
        match self {
            Self::All => query,
            Self::Owner(user_id) => query.filter(issue::Column::UserId.eq(user_id)),
        }
    }
}

/// Filters for the resolved-issue browse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedFilter<'a> {
    /// Exact category match.
    pub category: Option<&'a str>,
    /// Case-insensitive substring of title, description or location.
    pub search: Option<&'a str>,
}

/// One page of issues plus totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePage {
    /// Rows on the requested page.
    pub issues: Vec<issue::Model>,
    /// Matching rows across all pages.
    pub total: u64,
    /// Number of pages.
    pub pages: u64,
}

/// Issue count for one status.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct StatusCount {
    /// Status.
    pub status: IssueStatus,
    /// Issues with this status.
    pub count: i64,
}

/// Issue count for one category.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct CategoryCount {
    /// Category.
    pub category: String,
    /// Issues in this category.
    pub count: i64,
}

/// Issues created on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct DailyCount {
    /// Calendar day (UTC).
    pub date: NaiveDate,
    /// Issues created that day.
    pub count: i64,
}

/// Issue repository for database operations.
#[derive(Clone)]
pub struct IssueRepository {
    db: Arc<DatabaseConnection>,
}

impl IssueRepository {
    /// Create a new issue repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an issue by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<issue::Model>> {
        Issue::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an issue by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<issue::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::IssueNotFound(id.to_string()))
    }

    /// Create a new issue.
    pub async fn create(&self, model: issue::ActiveModel) -> AppResult<issue::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an issue (single-row `UPDATE ... RETURNING`).
    pub async fn update(&self, model: issue::ActiveModel) -> AppResult<issue::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest issues first, optionally capped at `limit`.
    pub async fn find_latest(
        &self,
        scope: IssueScope<'_>,
        limit: Option<u64>,
    ) -> AppResult<Vec<issue::Model>> {
        let mut query = scope
            .apply(Issue::find())
            .order_by_desc(issue::Column::CreatedAt)
            .order_by_desc(issue::Column::Id);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issue counts grouped by status. Statuses with no issues are absent.
    pub async fn count_by_status(&self, scope: IssueScope<'_>) -> AppResult<Vec<StatusCount>> {
        scope
            .apply(Issue::find())
            .select_only()
            .column(issue::Column::Status)
            .column_as(issue::Column::Id.count(), "count")
            .group_by(issue::Column::Status)
            .into_model::<StatusCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issue counts grouped by category.
    pub async fn count_by_category(&self, scope: IssueScope<'_>) -> AppResult<Vec<CategoryCount>> {
        scope
            .apply(Issue::find())
            .select_only()
            .column(issue::Column::Category)
            .column_as(issue::Column::Id.count(), "count")
            .group_by(issue::Column::Category)
            .order_by_asc(issue::Column::Category)
            .into_model::<CategoryCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issues created per calendar day since `since`, oldest day first.
    pub async fn count_by_day_since(
        &self,
        scope: IssueScope<'_>,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DailyCount>> {
        scope
            .apply(Issue::find())
            .select_only()
            .column_as(Expr::cust("DATE(created_at)"), "date")
            .column_as(issue::Column::Id.count(), "count")
            .filter(issue::Column::CreatedAt.gte(since))
            .group_by(Expr::cust("DATE(created_at)"))
            .order_by_asc(Expr::cust("DATE(created_at)"))
            .into_model::<DailyCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of issues created in `[start, end)`.
    pub async fn count_created_between(
        &self,
        scope: IssueScope<'_>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<u64> {
        scope
            .apply(Issue::find())
            .filter(issue::Column::CreatedAt.gte(start))
            .filter(issue::Column::CreatedAt.lt(end))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page (0-based) of resolved issues, most recently updated first.
    pub async fn find_resolved_page(
        &self,
        filter: ResolvedFilter<'_>,
        page: u64,
        per_page: u64,
    ) -> AppResult<IssuePage> {
        let mut query = Issue::find().filter(issue::Column::Status.eq(IssueStatus::Resolved));

        if let Some(category) = filter.category {
            query = query.filter(issue::Column::Category.eq(category));
        }

        if let Some(search) = filter.search {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            let matches = |column: issue::Column| {
                Expr::expr(Func::lower(Expr::col(column)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            query = query.filter(
                Condition::any()
                    .add(matches(issue::Column::Title))
                    .add(matches(issue::Column::Description))
                    .add(matches(issue::Column::Location)),
            );
        }

        let paginator = query
            .order_by_desc(issue::Column::UpdatedAt)
            .order_by_desc(issue::Column::Id)
            .paginate(self.db.as_ref(), per_page);

        let totals = paginator
            .num_items_and_pages()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Past the last page the offset would overflow for large page numbers
        let issues = if page < totals.number_of_pages {
            paginator
                .fetch_page(page)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
        } else {
            vec![]
        };

        Ok(IssuePage {
            issues,
            total: totals.number_of_items,
            pages: totals.number_of_pages,
        })
    }

    /// Every category in use, sorted.
    pub async fn distinct_categories(&self) -> AppResult<Vec<String>> {
        Issue::find()
            .select_only()
            .column(issue::Column::Category)
            .distinct()
            .order_by_asc(issue::Column::Category)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// `(created_at, updated_at)` of every resolved issue.
    pub async fn resolved_timestamps(
        &self,
    ) -> AppResult<Vec<(DateTimeWithTimeZone, DateTimeWithTimeZone)>> {
        Issue::find()
            .select_only()
            .column(issue::Column::CreatedAt)
            .column(issue::Column::UpdatedAt)
            .filter(issue::Column::Status.eq(IssueStatus::Resolved))
            .into_tuple::<(DateTimeWithTimeZone, DateTimeWithTimeZone)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
