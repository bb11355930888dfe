//! Core business logic for the civic tracker.

pub mod services;

pub use services::*;
