//! Database repositories.

mod issue;
mod issue_photo;
mod user;

pub use issue::{
    CategoryCount, DailyCount, IssuePage, IssueRepository, IssueScope, ResolvedFilter,
    StatusCount,
};
pub use issue_photo::IssuePhotoRepository;
pub use user::UserRepository;
