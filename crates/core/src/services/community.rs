//! Public browse of resolved issues.

use civic_common::AppResult;
use civic_db::{
    entities::issue::IssueStatus,
    repositories::{IssueRepository, IssueScope, ResolvedFilter},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::services::hydrate::{IssueHydrator, IssueWithOwner};

/// Resolved issues per page.
pub const PER_PAGE: u64 = 12;

/// Category value that disables the category filter.
const ALL_CATEGORIES: &str = "all";

/// Query string of the community page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseQuery {
    /// Exact category, or `all`.
    pub category: Option<String>,
    /// Substring of title, description or location.
    pub search: Option<String>,
    /// 1-based; anything unparsable or below 1 means the first page.
    pub page: Option<String>,
}

impl BrowseQuery {
    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
    }

    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .map_or(1, |p| p.max(1) as u64)
    }
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page returned.
    pub current_page: u64,
    /// Highest page number, at least 1.
    pub last_page: u64,
    /// Page size.
    pub per_page: u64,
    /// Matching issues across all pages.
    pub total: u64,
}

/// Global status counts and resolution speed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityStats {
    /// Resolved issues.
    pub resolved: i64,
    /// Issues in progress.
    pub in_progress: i64,
    /// Pending issues.
    pub pending: i64,
    /// Mean days from report to resolution.
    pub avg_resolution_days: f64,
}

/// Filters as applied, echoed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilters {
    /// Search text, if any.
    pub search: Option<String>,
    /// Category, `all` when unfiltered.
    pub category: String,
}

/// One page of the community browse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityPage {
    /// Resolved issues on this page.
    pub issues: Vec<IssueWithOwner>,
    /// Page metadata.
    pub pagination: Pagination,
    /// Every category in use, sorted.
    pub categories: Vec<String>,
    /// Global statistics.
    pub stats: CommunityStats,
    /// Filters as applied.
    pub filters: AppliedFilters,
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Mean fractional days from creation to last update, rounded to one decimal.
///
/// Zero when there is nothing to average.
#[must_use]
pub fn average_resolution_days(spans: &[(DateTimeWithTimeZone, DateTimeWithTimeZone)]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }

    let total_days: f64 = spans
        .iter()
        .map(|(created, updated)| {
            (*updated - *created).num_milliseconds().abs() as f64 / MILLIS_PER_DAY
        })
        .sum();
    let mean = total_days / spans.len() as f64;

    (mean * 10.0).round() / 10.0
}

/// Public, unauthenticated browse of resolved issues.
#[derive(Clone)]
pub struct CommunityService {
    issue_repo: IssueRepository,
    hydrator: IssueHydrator,
}

impl CommunityService {
    /// Create a new community service.
    #[must_use]
    pub const fn new(issue_repo: IssueRepository, hydrator: IssueHydrator) -> Self {
        Self {
            issue_repo,
            hydrator,
        }
    }

    /// Resolved issues matching the query, plus page-wide statistics.
    pub async fn browse(&self, query: &BrowseQuery) -> AppResult<CommunityPage> {
        let current_page = query.page();
        let filter = ResolvedFilter {
            category: query.category(),
            search: query.search(),
        };

        let page = self
            .issue_repo
            .find_resolved_page(filter, current_page - 1, PER_PAGE)
            .await?;
        let issues = self.hydrator.with_owners(page.issues).await?;

        let categories = self.issue_repo.distinct_categories().await?;

        let counts = self.issue_repo.count_by_status(IssueScope::All).await?;
        let count_of = |status: IssueStatus| {
            counts
                .iter()
                .filter(|c| c.status == status)
                .map(|c| c.count)
                .sum::<i64>()
        };

        let spans = self.issue_repo.resolved_timestamps().await?;

        Ok(CommunityPage {
            issues,
            pagination: Pagination {
                current_page,
                last_page: page.pages.max(1),
                per_page: PER_PAGE,
                total: page.total,
            },
            categories,
            stats: CommunityStats {
                resolved: count_of(IssueStatus::Resolved),
                in_progress: count_of(IssueStatus::InProgress),
                pending: count_of(IssueStatus::Pending),
                avg_resolution_days: average_resolution_days(&spans),
            },
            filters: AppliedFilters {
                search: filter.search.map(str::to_string),
                category: filter.category.unwrap_or(ALL_CATEGORIES).to_string(),
            },
        })
    }
}
