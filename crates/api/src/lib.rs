//! HTTP API layer for the civic tracker.
//!
//! - **Endpoints**: dashboard, issue submission, admin triage and the public
//!   community page
//! - **Extractors**: authenticated and admin users
//! - **Middleware**: bearer-token authentication and shared state
//!
//! Built on Axum 0.8. Errors render through [`civic_common::AppError`].

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
