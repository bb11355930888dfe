//! Identifiers for users, issues and photos.
//!
//! Every row key is a lowercase ULID. The leading 48 bits carry the
//! creation time in milliseconds, so sorting by key matches sorting by
//! `created_at` to the millisecond.

use ulid::Ulid;

/// Hands out row keys and file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// A fresh lowercase ULID.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
