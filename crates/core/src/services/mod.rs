//! Business logic services.

pub mod community;
pub mod dashboard;
pub mod hydrate;
pub mod issue;
pub mod photo;
pub mod triage;
pub mod user;

pub use community::{BrowseQuery, CommunityPage, CommunityService};
pub use dashboard::{AdminView, Dashboard, DashboardService, DashboardView, UserView};
pub use hydrate::{IssueDetails, IssueHydrator, IssueWithOwner, OwnerSummary, PhotoView};
pub use issue::{CreateIssueInput, IssueService};
pub use photo::{MAX_PHOTO_SIZE, PhotoFormat, PhotoService, PhotoUpload, StorageService};
pub use triage::{TriageService, UpdateIssueInput};
pub use user::UserService;
