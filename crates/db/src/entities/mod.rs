//! Database entities.

#![allow(missing_docs)]

pub mod issue;
pub mod issue_photo;
pub mod user;

pub use issue::Entity as Issue;
pub use issue_photo::Entity as IssuePhoto;
pub use user::Entity as User;
