//! Dashboard aggregation.
//!
//! What a viewer sees is decided once per request by picking a
//! [`DashboardView`]: admins get [`AdminView`], everyone else [`UserView`].

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use civic_common::{AppError, AppResult};
use civic_db::{
    entities::{issue::IssueStatus, user},
    repositories::{CategoryCount, DailyCount, IssueRepository, IssueScope},
};
use serde::Serialize;

use crate::services::hydrate::{IssueHydrator, IssueWithOwner};

/// Length of the daily-count window shown to admins.
const TREND_DAYS: i64 = 30;

/// One point of the status chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPoint {
    /// Status label, e.g. `In Progress`.
    pub status: &'static str,
    /// Issues with that status.
    pub count: i64,
}

/// Issues created this calendar month against last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthComparison {
    /// Created since the start of the current month.
    pub this_month: u64,
    /// Created during the previous month.
    pub last_month: u64,
}

/// System-wide breakdowns only admins see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insights {
    /// Counts per category.
    pub issues_by_category: Vec<CategoryCount>,
    /// Counts per day over the trailing 30 days.
    pub issues_by_date: Vec<DailyCount>,
    /// Current month against the previous one.
    pub month_comparison: MonthComparison,
}

/// Aggregated dashboard data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// All issues in scope.
    pub total: i64,
    /// Issues awaiting triage.
    pub pending: i64,
    /// Issues being worked on.
    pub in_progress: i64,
    /// Issues marked resolved.
    pub resolved: i64,
    /// Newest issues first.
    pub recent_issues: Vec<IssueWithOwner>,
    /// Chart series, one point per status.
    pub issues_by_status: Vec<StatusPoint>,
    /// Admin-only breakdowns, inlined into the JSON.
    #[serde(flatten)]
    pub insights: Option<Insights>,
}

/// Role-specific part of the dashboard.
#[async_trait]
pub trait DashboardView: Send + Sync {
    /// Issues the counts and recent list are drawn from.
    fn scope(&self) -> IssueScope<'_>;

    /// Number of recent issues to show.
    fn recent_limit(&self) -> u64;

    /// Extra breakdowns, if this view has any.
    async fn insights(
        &self,
        issues: &IssueRepository,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Insights>>;
}

/// System-wide view for administrators.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminView;

#[async_trait]
impl DashboardView for AdminView {
    fn scope(&self) -> IssueScope<'_> {
        IssueScope::All
    }

    fn recent_limit(&self) -> u64 {
        10
    }

    async fn insights(
        &self,
        issues: &IssueRepository,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Insights>> {
        let issues_by_category = issues.count_by_category(IssueScope::All).await?;
        let issues_by_date = issues
            .count_by_day_since(IssueScope::All, now - Duration::days(TREND_DAYS))
            .await?;

        let (last_start, this_start, next_start) = month_bounds(now)
            .ok_or_else(|| AppError::Internal(format!("No calendar month contains {now}")))?;
        let month_comparison = MonthComparison {
            this_month: issues
                .count_created_between(IssueScope::All, this_start, next_start)
                .await?,
            last_month: issues
                .count_created_between(IssueScope::All, last_start, this_start)
                .await?,
        };

        Ok(Some(Insights {
            issues_by_category,
            issues_by_date,
            month_comparison,
        }))
    }
}

/// A standard user's view of their own issues.
#[derive(Debug, Clone, Copy)]
pub struct UserView<'a> {
    user_id: &'a str,
}

impl<'a> UserView<'a> {
    /// View for the given user.
    #[must_use]
    pub const fn new(user_id: &'a str) -> Self {
        Self { user_id }
    }
}

#[async_trait]
impl DashboardView for UserView<'_> {
    fn scope(&self) -> IssueScope<'_> {
        IssueScope::Owner(self.user_id)
    }

    fn recent_limit(&self) -> u64 {
        5
    }

    async fn insights(&self, _: &IssueRepository, _: DateTime<Utc>) -> AppResult<Option<Insights>> {
        Ok(None)
    }
}

/// Start of the previous, current and next calendar month (UTC).
#[must_use]
pub fn month_bounds(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = (now.year(), now.month());
    let (last_year, last_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    Some((
        month_start(last_year, last_month)?,
        month_start(year, month)?,
        month_start(next_year, next_month)?,
    ))
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Builds dashboards.
#[derive(Clone)]
pub struct DashboardService {
    issue_repo: IssueRepository,
    hydrator: IssueHydrator,
}

impl DashboardService {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(issue_repo: IssueRepository, hydrator: IssueHydrator) -> Self {
        Self {
            issue_repo,
            hydrator,
        }
    }

    /// Pick the view matching the viewer's role.
    #[must_use]
    pub fn view_for(viewer: &user::Model) -> Box<dyn DashboardView + '_> {
        if viewer.is_admin {
            Box::new(AdminView)
        } else {
            Box::new(UserView::new(&viewer.id))
        }
    }

    /// Dashboard for the given viewer as of now.
    pub async fn for_viewer(&self, viewer: &user::Model) -> AppResult<Dashboard> {
        let view = Self::view_for(viewer);
        self.build(view.as_ref(), Utc::now()).await
    }

    /// Dashboard for a view as of `now`.
    pub async fn build(&self, view: &dyn DashboardView, now: DateTime<Utc>) -> AppResult<Dashboard> {
        let counts = self.issue_repo.count_by_status(view.scope()).await?;
        let count_of = |status: IssueStatus| {
            counts
                .iter()
                .filter(|c| c.status == status)
                .map(|c| c.count)
                .sum::<i64>()
        };

        let recent = self
            .issue_repo
            .find_latest(view.scope(), Some(view.recent_limit()))
            .await?;
        let recent_issues = self.hydrator.with_owners(recent).await?;

        let insights = view.insights(&self.issue_repo, now).await?;

        Ok(Dashboard {
            total: counts.iter().map(|c| c.count).sum(),
            pending: count_of(IssueStatus::Pending),
            in_progress: count_of(IssueStatus::InProgress),
            resolved: count_of(IssueStatus::Resolved),
            recent_issues,
            issues_by_status: IssueStatus::ALL
                .into_iter()
                .map(|status| StatusPoint {
                    status: status.label(),
                    count: count_of(status),
                })
                .collect(),
            insights,
        })
    }
}
